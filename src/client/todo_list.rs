use std::str::FromStr;

use tracing::{info, warn};

use super::{
    api::TodoApi,
    form::TodoForm,
    session::{Session, SessionState},
    ClientError,
};
use crate::todos::{Status, Todo, TodoPatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub status: StatusFilter,
    pub search: String,
}

impl Filter {
    pub fn matches(&self, todo: &Todo) -> bool {
        let status_match = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(s) => todo.status == s,
        };
        status_match
            && todo
                .title
                .to_lowercase()
                .contains(&self.search.to_lowercase())
    }
}

/// Undo record for an optimistic change. Dropping it commits.
#[derive(Debug)]
enum PendingOp {
    /// Put a removed todo back where it was.
    Reinsert { index: usize, todo: Todo },
    /// Swap the optimistic copy for the last confirmed one.
    Revert(Todo),
}

impl PendingOp {
    fn rollback(self, todos: &mut Vec<Todo>) {
        match self {
            PendingOp::Reinsert { index, todo } => {
                let index = index.min(todos.len());
                todos.insert(index, todo);
            }
            PendingOp::Revert(todo) => {
                if let Some(slot) = todos.iter_mut().find(|t| t.id == todo.id) {
                    *slot = todo;
                }
            }
        }
    }
}

/// State behind the todo screen: the owner's todos, the filter inputs,
/// and the add/edit form.
#[derive(Debug)]
pub struct TodoListView {
    todos: Vec<Todo>,
    loading: bool,
    last_error: Option<String>,
    pub form: TodoForm,
    pub filter: Filter,
}

impl Default for TodoListView {
    fn default() -> Self {
        Self {
            todos: Vec::new(),
            loading: true,
            last_error: None,
            form: TodoForm::default(),
            filter: Filter::default(),
        }
    }
}

impl TodoListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Todos passing the current filter, in list order.
    pub fn filtered(&self) -> Vec<&Todo> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    /// Fetches the owner's todos. Does nothing without a session. A failed
    /// fetch keeps whatever was already shown.
    pub async fn load(
        &mut self,
        api: &dyn TodoApi,
        state: &SessionState,
    ) -> Result<(), ClientError> {
        let SessionState::Authenticated(session) = state else {
            return Ok(());
        };
        self.loading = true;
        let res = api.list(session).await;
        self.loading = false;
        match res {
            Ok(todos) => {
                self.todos = todos;
                self.last_error = None;
                Ok(())
            }
            Err(e) => Err(self.fail("load todos", e)),
        }
    }

    /// Submits the form: create when it is new, update when editing.
    /// Returns `Ok(None)` if the form failed validation (nothing was sent).
    pub async fn save(
        &mut self,
        api: &dyn TodoApi,
        session: &Session,
    ) -> Result<Option<Todo>, ClientError> {
        let draft = match self.form.validate() {
            Ok(d) => d,
            Err(msg) => {
                self.form.error = Some(msg.to_string());
                return Ok(None);
            }
        };
        self.form.error = None;

        let saved = match self.form.editing_id() {
            Some(id) => {
                let patch = TodoPatch {
                    title: Some(draft.title),
                    description: Some(draft.description),
                    status: Some(draft.status),
                };
                let todo = api
                    .update(session, id, &patch)
                    .await
                    .map_err(|e| self.fail("update todo", e))?;
                if let Some(slot) = self.todos.iter_mut().find(|t| t.id == id) {
                    *slot = todo.clone();
                }
                todo
            }
            None => {
                let todo = api
                    .create(session, &draft)
                    .await
                    .map_err(|e| self.fail("create todo", e))?;
                self.todos.insert(0, todo.clone());
                todo
            }
        };
        self.form.close();
        Ok(Some(saved))
    }

    /// Removes the todo right away; puts it back if the server refuses.
    pub async fn delete(
        &mut self,
        api: &dyn TodoApi,
        session: &Session,
        id: i64,
    ) -> Result<(), ClientError> {
        let pending = self
            .todos
            .iter()
            .position(|t| t.id == id)
            .map(|index| PendingOp::Reinsert {
                index,
                todo: self.todos.remove(index),
            });

        if let Err(e) = api.delete(session, id).await {
            if let Some(op) = pending {
                op.rollback(&mut self.todos);
            }
            return Err(self.fail("delete todo", e));
        }
        info!(todo_id = id, "todo deleted");
        Ok(())
    }

    /// Flips Pending/Completed locally, then sends the new status. The
    /// server's copy wins on success; the old one is restored on failure.
    pub async fn toggle(
        &mut self,
        api: &dyn TodoApi,
        session: &Session,
        id: i64,
    ) -> Result<Option<Todo>, ClientError> {
        let Some(slot) = self.todos.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let pending = PendingOp::Revert(slot.clone());
        let new_status = slot.status.toggled();
        slot.status = new_status;

        match api.update(session, id, &TodoPatch::status(new_status)).await {
            Ok(todo) => {
                if let Some(slot) = self.todos.iter_mut().find(|t| t.id == id) {
                    *slot = todo.clone();
                }
                Ok(Some(todo))
            }
            Err(e) => {
                pending.rollback(&mut self.todos);
                Err(self.fail("toggle todo", e))
            }
        }
    }

    fn fail(&mut self, action: &'static str, e: ClientError) -> ClientError {
        warn!(error = %e, action, "todo request failed");
        self.last_error = Some(e.to_string());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::client::form::TITLE_REQUIRED;
    use crate::todos::NewTodo;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use uuid::Uuid;

    /// Server stand-in that records the patches it receives.
    #[derive(Default)]
    struct FakeApi {
        rows: Mutex<Vec<Todo>>,
        next_id: AtomicI64,
        fail: AtomicBool,
        patches: Mutex<Vec<(i64, TodoPatch)>>,
        calls: AtomicI64,
    }

    impl FakeApi {
        fn failing(&self, on: bool) {
            self.fail.store(on, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: 500,
                    message: "Server error".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TodoApi for FakeApi {
        async fn list(&self, session: &Session) -> Result<Vec<Todo>, ClientError> {
            self.check()?;
            let mut rows: Vec<Todo> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == session.user.id)
                .cloned()
                .collect();
            rows.reverse();
            Ok(rows)
        }

        async fn create(&self, session: &Session, todo: &NewTodo) -> Result<Todo, ClientError> {
            self.check()?;
            let row = Todo {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                title: todo.title.clone(),
                description: todo.description.clone(),
                status: todo.status,
                user_id: session.user.id,
                created_at: OffsetDateTime::now_utc(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update(
            &self,
            _session: &Session,
            id: i64,
            patch: &TodoPatch,
        ) -> Result<Todo, ClientError> {
            self.check()?;
            self.patches.lock().unwrap().push((id, patch.clone()));
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(ClientError::Api {
                    status: 404,
                    message: "Todo not found".into(),
                })?;
            patch.apply_to(row);
            Ok(row.clone())
        }

        async fn delete(&self, _session: &Session, id: i64) -> Result<(), ClientError> {
            self.check()?;
            self.rows.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    fn session() -> Session {
        Session {
            user: User {
                id: Uuid::new_v4(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                created_at: OffsetDateTime::now_utc(),
            },
            access_token: "tok".into(),
        }
    }

    async fn add(view: &mut TodoListView, api: &FakeApi, s: &Session, title: &str, status: Status) -> Todo {
        view.form.open_new();
        view.form.set_title(title);
        view.form.set_status(status);
        view.save(api, s).await.unwrap().expect("valid form")
    }

    #[tokio::test]
    async fn anonymous_load_does_not_fetch() {
        let api = FakeApi::default();
        let mut view = TodoListView::new();
        view.load(&api, &SessionState::Anonymous).await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert!(view.is_loading());
    }

    #[tokio::test]
    async fn load_failure_keeps_items_and_surfaces_error() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        add(&mut view, &api, &s, "Buy milk", Status::Pending).await;

        api.failing(true);
        let state = SessionState::Authenticated(s);
        assert!(view.load(&api, &state).await.is_err());
        assert!(!view.is_loading());
        assert_eq!(view.todos().len(), 1);
        assert_eq!(view.last_error(), Some("Server error"));
    }

    #[tokio::test]
    async fn buy_milk_scenario() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        view.load(&api, &SessionState::Authenticated(s.clone())).await.unwrap();

        add(&mut view, &api, &s, "Older", Status::Pending).await;
        let milk = add(&mut view, &api, &s, "Buy milk", Status::Pending).await;
        assert_eq!(view.todos()[0].id, milk.id, "new todo is shown first");
        assert!(!view.form.is_open());

        let t = view.toggle(&api, &s, milk.id).await.unwrap().unwrap();
        assert_eq!(t.status, Status::Completed);
        let t = view.toggle(&api, &s, milk.id).await.unwrap().unwrap();
        assert_eq!(t.status, Status::Pending);

        // The new status is what goes over the wire, every time.
        let sent: Vec<Option<Status>> = api
            .patches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.status)
            .collect();
        assert_eq!(sent, vec![Some(Status::Completed), Some(Status::Pending)]);

        view.delete(&api, &s, milk.id).await.unwrap();
        assert!(view.todos().iter().all(|t| t.id != milk.id));

        view.load(&api, &SessionState::Authenticated(s.clone())).await.unwrap();
        assert!(view.todos().iter().all(|t| t.id != milk.id));
        assert_eq!(view.todos().len(), 1);
    }

    #[tokio::test]
    async fn failed_toggle_reverts() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        let todo = add(&mut view, &api, &s, "Buy milk", Status::Pending).await;

        api.failing(true);
        assert!(view.toggle(&api, &s, todo.id).await.is_err());
        assert_eq!(view.todos()[0].status, Status::Pending);
        assert!(view.last_error().is_some());
    }

    #[tokio::test]
    async fn failed_delete_restores_position() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        add(&mut view, &api, &s, "c", Status::Pending).await;
        let middle = add(&mut view, &api, &s, "b", Status::Pending).await;
        add(&mut view, &api, &s, "a", Status::Pending).await;

        api.failing(true);
        assert!(view.delete(&api, &s, middle.id).await.is_err());
        let titles: Vec<&str> = view.todos().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn blank_title_sets_form_error_without_request() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        view.form.open_new();
        view.form.set_description("no title");
        assert_eq!(view.save(&api, &s).await.unwrap(), None);
        assert_eq!(view.form.error.as_deref(), Some(TITLE_REQUIRED));
        assert!(view.form.is_open());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn edit_replaces_entry_with_server_copy() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        let todo = add(&mut view, &api, &s, "Draft report", Status::Pending).await;

        view.form.open_edit(&todo);
        view.form.set_title("Final report");
        let saved = view.save(&api, &s).await.unwrap().unwrap();
        assert_eq!(saved.title, "Final report");
        assert_eq!(view.todos(), &[saved]);
        assert!(!view.form.is_open());
    }

    #[tokio::test]
    async fn failed_save_keeps_form_open() {
        let api = FakeApi::default();
        let s = session();
        let mut view = TodoListView::new();
        view.form.open_new();
        view.form.set_title("Buy milk");
        api.failing(true);
        assert!(view.save(&api, &s).await.is_err());
        assert!(view.form.is_open());
        assert!(view.todos().is_empty());
    }

    #[test]
    fn filter_intersects_status_and_search() {
        let owner = Uuid::new_v4();
        let mk = |id, title: &str, status| Todo {
            id,
            title: title.into(),
            description: String::new(),
            status,
            user_id: owner,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut view = TodoListView::new();
        view.todos = vec![
            mk(1, "Quarterly REPORT", Status::Completed),
            mk(2, "report draft", Status::Pending),
            mk(3, "Buy milk", Status::Completed),
            mk(4, "Send report", Status::Completed),
        ];
        view.filter = Filter {
            status: StatusFilter::Only(Status::Completed),
            search: "report".into(),
        };
        let ids: Vec<i64> = view.filtered().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 4]);

        view.filter = Filter::default();
        assert_eq!(view.filtered().len(), 4);
    }

    #[test]
    fn status_filter_parses() {
        assert_eq!("ALL".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "completed".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(Status::Completed)
        );
        assert!("archived".parse::<StatusFilter>().is_err());
    }
}
