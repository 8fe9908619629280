use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommentStore, DuplicateKey, RecipeStore, UserStore};
use crate::models::{
    Comment, NewComment, NewRecipe, NewUser, ProfileChanges, Recipe, RecipeChanges, User,
};

#[derive(Default)]
struct Collections {
    // insertion order doubles as natural fetch order
    recipes: Vec<Recipe>,
    users: Vec<User>,
    comments: Vec<Comment>,
}

/// Process-local store. Each collection is a `Vec` behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn list_recipes(&self) -> anyhow::Result<Vec<Recipe>> {
        Ok(self.inner.read().await.recipes.clone())
    }

    async fn list_recipes_by_creator(&self, user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner
            .recipes
            .iter()
            .filter(|r| r.creator.id == user_id)
            .cloned()
            .collect())
    }

    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner
            .recipes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn find_recipe_by_name(&self, name: &str) -> anyhow::Result<Option<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner.recipes.iter().find(|r| r.name == name).cloned())
    }

    async fn find_recipe_owned_by(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner
            .recipes
            .iter()
            .find(|r| r.id == id && r.creator.id == user_id)
            .cloned())
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .recipes
            .push(recipe.clone().into_recipe(id));
        Ok(id)
    }

    async fn update_recipe(&self, id: Uuid, changes: &RecipeChanges) -> anyhow::Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(recipe) = inner.recipes.iter_mut().find(|r| r.id == id) else {
            return Ok(0);
        };
        recipe.name = changes.name.clone();
        recipe.ingredients = changes.ingredients.clone();
        recipe.instructions = changes.instructions.clone();
        recipe.image_url = changes.image_url.clone();
        recipe.updated_at = changes.updated_at;
        Ok(1)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(DuplicateKey(user.email.clone()).into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<u64> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &changes.email {
            if inner.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DuplicateKey(email.clone()).into());
            }
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(0);
        };
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: &NewComment) -> anyhow::Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            recipe_name: comment.recipe_name.clone(),
            user_id: comment.user_id,
            user_name: comment.user_name.clone(),
            text: comment.text.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments_for_recipe(&self, recipe_name: &str) -> anyhow::Result<Vec<Comment>> {
        let inner = self.inner.read().await;
        // later inserts first; stable on equal timestamps
        Ok(inner
            .comments
            .iter()
            .rev()
            .filter(|c| c.recipe_name == recipe_name)
            .cloned()
            .collect())
    }

    async fn delete_comment(
        &self,
        id: Uuid,
        recipe_name: &str,
        user_id: Uuid,
    ) -> anyhow::Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.comments.len();
        inner
            .comments
            .retain(|c| !(c.id == id && c.recipe_name == recipe_name && c.user_id == user_id));
        Ok((before - inner.comments.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Creator, Ingredient};

    fn new_recipe(name: &str, creator_id: Uuid) -> NewRecipe {
        let now = OffsetDateTime::now_utc();
        NewRecipe {
            name: name.into(),
            ingredients: vec![Ingredient::named("sale")],
            instructions: vec!["mix".into()],
            image_url: None,
            creator: Creator {
                id: creator_id,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn find_by_ids_collapses_repeated_ids() {
        let store = MemoryStore::new();
        let id = store.insert_recipe(&new_recipe("pasta", Uuid::new_v4())).await.unwrap();
        let found = store.find_recipes_by_ids(&[id, id]).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn owned_lookup_checks_creator() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let id = store.insert_recipe(&new_recipe("pasta", owner)).await.unwrap();
        assert!(store.find_recipe_owned_by(id, owner).await.unwrap().is_some());
        assert!(store.find_recipe_owned_by(id, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_comment_requires_matching_author() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let comment = store
            .insert_comment(&NewComment {
                recipe_name: "pasta".into(),
                user_id: author,
                user_name: "Ada".into(),
                text: "buona".into(),
            })
            .await
            .unwrap();

        let deleted = store
            .delete_comment(comment.id, "pasta", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        let deleted = store.delete_comment(comment.id, "pasta", author).await.unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = MemoryStore::new();
        let user = NewUser {
            email: "ada@example.com".into(),
            name: "Ada".into(),
            password_hash: "hash".into(),
        };
        let first = store.insert_user(&user).await.unwrap();
        let err = store.insert_user(&user).await.unwrap_err();
        assert!(err.is::<DuplicateKey>());

        let other = store
            .insert_user(&NewUser {
                email: "bob@example.com".into(),
                ..user
            })
            .await
            .unwrap();
        let taken = ProfileChanges {
            email: Some(first.email.clone()),
            ..Default::default()
        };
        let err = store.update_user_profile(other.id, &taken).await.unwrap_err();
        assert!(err.is::<DuplicateKey>());
        assert_eq!(store.update_user_profile(first.id, &taken).await.unwrap(), 1);
    }
}
