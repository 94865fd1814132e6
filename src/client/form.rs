use crate::todos::{NewTodo, Status, Todo};

pub const TITLE_REQUIRED: &str = "Please enter the todo title";

/// Add/edit todo modal. Pure field state: it never talks to the server,
/// the list view decides what to do with a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoForm {
    open: bool,
    editing_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub error: Option<String>,
}

impl TodoForm {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn open_new(&mut self) {
        self.reset();
        self.open = true;
    }

    pub fn open_edit(&mut self, todo: &Todo) {
        self.editing_id = Some(todo.id);
        self.title = todo.title.clone();
        self.description = todo.description.clone();
        self.status = todo.status;
        self.error = None;
        self.open = true;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn close(&mut self) {
        self.reset();
    }

    pub fn heading(&self) -> &'static str {
        if self.editing_id.is_some() {
            "Edit Todo"
        } else {
            "Add Todo"
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.editing_id.is_some() {
            "Save Changes"
        } else {
            "Create Todo"
        }
    }

    /// Current fields as a todo, or the message to show next to the form.
    pub fn validate(&self) -> Result<NewTodo, &'static str> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TITLE_REQUIRED);
        }
        Ok(NewTodo {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            status: self.status,
        })
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
