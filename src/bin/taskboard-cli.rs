use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use taskboard::client::{
    guard, ApiClient, AuthApi, ClientError, FileStorage, Filter, Gate, Session, SessionState,
    SessionStore, StatusFilter, TodoListView,
};
use taskboard::todos::{Status, Todo};

#[derive(Parser, Debug)]
#[command(name = "taskboard-cli", about = "Terminal front end for a taskboard server")]
struct Cli {
    #[arg(long, env = "TASKBOARD_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Where the logged-in session is kept between runs.
    #[arg(long, env = "TASKBOARD_SESSION_DIR", default_value = ".taskboard")]
    session_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    List {
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        status: FilterArg,
        #[arg(long, default_value = "")]
        search: String,
    },
    Add(TodoFields),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: EditFields,
    },
    Toggle {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct TodoFields {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
    status: StatusArg,
}

#[derive(Args, Debug)]
struct EditFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Completed,
}

impl From<StatusArg> for Status {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Pending => Status::Pending,
            StatusArg::Completed => Status::Completed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterArg {
    All,
    Pending,
    Completed,
}

impl From<FilterArg> for StatusFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => StatusFilter::All,
            FilterArg::Pending => StatusFilter::Only(Status::Pending),
            FilterArg::Completed => StatusFilter::Only(Status::Completed),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `taskboard-cli login` first")]
    LoginRequired,
    #[error("no todo with id {0}")]
    UnknownTodo(i64),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "taskboard=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.base_url);
    let mut store = SessionStore::new(FileStorage::new(&cli.session_dir));
    store.restore();

    let uses_token = !matches!(cli.command, Command::Signup { .. } | Command::Login { .. });
    match run(cli.command, &api, &mut store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Client(e)) if uses_token && e.is_unauthorized() => {
            // The saved token is no longer accepted.
            if let Err(e) = store.set(None) {
                tracing::warn!(error = %e, "failed to clear session");
            }
            eprintln!("error: session expired; log in again");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    api: &ApiClient,
    store: &mut SessionStore<FileStorage>,
) -> Result<(), CliError> {
    match command {
        Command::Signup {
            name,
            email,
            password,
        } => {
            let created = api.signup(&name, &email, &password).await?;
            println!(
                "Account created for {} <{}>. Log in to continue.",
                created.name, created.email
            );
        }
        Command::Login { email, password } => {
            let session = api.login(&email, &password).await?;
            println!("Logged in as {} <{}>", session.user.name, session.user.email);
            store.set(Some(session))?;
        }
        Command::Logout => {
            store.set(None)?;
            println!("Logged out");
        }
        Command::Whoami => {
            let session = authenticated(store)?;
            println!(
                "{} <{}> ({})",
                session.user.name, session.user.email, session.user.id
            );
        }
        Command::List { status, search } => {
            let session = authenticated(store)?.clone();
            let mut view = loaded_view(api, &session).await?;
            view.filter = Filter {
                status: status.into(),
                search,
            };
            let shown = view.filtered();
            if shown.is_empty() {
                println!("No matching tasks found");
            }
            for todo in shown {
                print_todo(todo);
            }
        }
        Command::Add(fields) => {
            let session = authenticated(store)?.clone();
            let mut view = TodoListView::new();
            view.form.open_new();
            view.form.set_title(fields.title);
            view.form.set_description(fields.description);
            view.form.set_status(fields.status.into());
            let todo = save(&mut view, api, &session).await?;
            print_todo(&todo);
        }
        Command::Edit { id, fields } => {
            let session = authenticated(store)?.clone();
            let mut view = loaded_view(api, &session).await?;
            let current = find(&view, id)?.clone();
            view.form.open_edit(&current);
            if let Some(title) = fields.title {
                view.form.set_title(title);
            }
            if let Some(description) = fields.description {
                view.form.set_description(description);
            }
            if let Some(status) = fields.status {
                view.form.set_status(status.into());
            }
            let todo = save(&mut view, api, &session).await?;
            print_todo(&todo);
        }
        Command::Toggle { id } => {
            let session = authenticated(store)?.clone();
            let mut view = loaded_view(api, &session).await?;
            let todo = view
                .toggle(api, &session, id)
                .await?
                .ok_or(CliError::UnknownTodo(id))?;
            print_todo(&todo);
        }
        Command::Delete { id } => {
            let session = authenticated(store)?.clone();
            let mut view = loaded_view(api, &session).await?;
            find(&view, id)?;
            view.delete(api, &session, id).await?;
            println!("Deleted #{id}");
        }
    }
    Ok(())
}

fn authenticated(store: &SessionStore<FileStorage>) -> Result<&Session, CliError> {
    match guard(store.state()) {
        Gate::Render(session) => Ok(session),
        Gate::Wait | Gate::RedirectToLogin => Err(CliError::LoginRequired),
    }
}

async fn loaded_view(api: &ApiClient, session: &Session) -> Result<TodoListView, CliError> {
    let mut view = TodoListView::new();
    view.load(api, &SessionState::Authenticated(session.clone()))
        .await?;
    Ok(view)
}

async fn save(
    view: &mut TodoListView,
    api: &ApiClient,
    session: &Session,
) -> Result<Todo, CliError> {
    match view.save(api, session).await? {
        Some(todo) => Ok(todo),
        None => Err(CliError::Invalid(view.form.error.clone().unwrap_or_default())),
    }
}

fn find(view: &TodoListView, id: i64) -> Result<&Todo, CliError> {
    view.todos()
        .iter()
        .find(|t| t.id == id)
        .ok_or(CliError::UnknownTodo(id))
}

fn print_todo(todo: &Todo) {
    let mark = if todo.status == Status::Completed { "x" } else { " " };
    println!("[{mark}] #{:<5} {} ({})", todo.id, todo.title, todo.status);
    if !todo.description.is_empty() {
        println!("          {}", todo.description);
    }
}
