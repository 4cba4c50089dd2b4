use crate::entities::sea_orm_active_enums::Category;
use crate::entities::*;
use sea_orm::*;
use std::collections::HashSet;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: i32,
    title: String,
    category: Category,
}

impl Todo {
    pub fn new(id: i32, title: String, category: Category) -> Self {
        Self {
            id,
            title,
            category,
        }
    }

    /// Returns the ID of the todo.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title of the todo.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the workflow category of the todo.
    pub fn category(&self) -> Category {
        self.category
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(model.id, model.title, model.category)
    }
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a todo not found error.
    #[error("Todo with ID {0} not found")]
    TodoNotFound(i32),
}

/// Returns the smallest positive id that is not already taken.
pub fn next_free_id(existing_ids: impl IntoIterator<Item = i32>) -> i32 {
    let taken: HashSet<i32> = existing_ids.into_iter().collect();
    let mut candidate = 1;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Treats a write that matched no row as the todo having been deleted meanwhile.
fn not_found_if_unmatched(id: i32, err: DbErr) -> TodoServiceError {
    match err {
        DbErr::RecordNotUpdated => TodoServiceError::TodoNotFound(id),
        other => TodoServiceError::Database(other),
    }
}

pub struct TodoService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TodoService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TodoService<'_> {
        TodoService { db }
    }

    /// Retrieves all todos from the database.
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = todo::Entity::find()
            .order_by_asc(todo::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    /// Creates a new todo, giving it the smallest id not currently in use.
    ///
    /// The id scan and the insert share one serializable transaction, so two
    /// racing creators cannot both commit the same id; the loser fails with a
    /// database error instead.
    ///
    /// # Arguments
    ///
    /// * `title` - The title of the todo.
    /// * `category` - The workflow category of the todo.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(
        &self,
        title: String,
        category: Category,
    ) -> Result<Todo, TodoServiceError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let existing_ids: Vec<i32> = todo::Entity::find()
            .select_only()
            .column(todo::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        let id = next_free_id(existing_ids);

        let active_model = todo::ActiveModel {
            id: ActiveValue::Set(id),
            title: ActiveValue::Set(title),
            category: ActiveValue::Set(category),
        };
        let created_model = active_model.insert(&txn).await?;
        txn.commit().await?;

        tracing::debug!("Created todo with ID {}", created_model.id);
        Ok(Todo::from(created_model))
    }

    /// Overwrites the title and category of an existing todo. Never inserts.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the todo to update.
    /// * `title` - The new title.
    /// * `category` - The new category.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Todo`, `TodoNotFound` if no todo has
    /// that ID, or a database error.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo_by_id(
        &self,
        id: i32,
        title: String,
        category: Category,
    ) -> Result<Todo, TodoServiceError> {
        let txn = self.db.begin().await?;

        let todo_to_update = todo::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(TodoServiceError::TodoNotFound(id))?;

        let mut active_model: todo::ActiveModel = todo_to_update.into();
        active_model.title = ActiveValue::Set(title);
        active_model.category = ActiveValue::Set(category);
        let updated_model = active_model
            .update(&txn)
            .await
            .map_err(|err| not_found_if_unmatched(id, err))?;
        txn.commit().await?;

        Ok(Todo::from(updated_model))
    }

    /// Permanently deletes a todo by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the todo to delete.
    ///
    /// # Returns
    ///
    /// A `Result` that is empty on success, `TodoNotFound` if no todo has that
    /// ID, or a database error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo_by_id(&self, id: i32) -> Result<(), TodoServiceError> {
        let txn = self.db.begin().await?;

        let todo_to_delete = todo::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(TodoServiceError::TodoNotFound(id))?;

        // Another request may have removed the row since it was read.
        let result = todo_to_delete.delete(&txn).await?;
        if result.rows_affected == 0 {
            return Err(TodoServiceError::TodoNotFound(id));
        }
        txn.commit().await?;
        Ok(())
    }
}
