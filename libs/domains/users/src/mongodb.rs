//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::mongodb::is_duplicate_key;
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Bson, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User, UserFilter, UserPatch, normalize_email};
use crate::repository::UserRepository;

pub const USERS_COLLECTION: &str = "users";

/// Stored shape of a user: BSON UUID for `_id`, BSON dates for timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_approved: Option<bool>,
    #[serde(default)]
    is_suspended: bool,
    #[serde(default)]
    suspension_reason: Option<String>,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    verification_token: Option<String>,
    #[serde(default)]
    approval_token: Option<String>,
    #[serde(default)]
    reset_password_token: Option<String>,
    #[serde(default)]
    reset_password_expires: Option<bson::DateTime>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    business_name: Option<String>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn to_bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn to_bson_date(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn from_bson_date(at: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        Self {
            id: to_bson_uuid(user.id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_verified: user.is_verified,
            is_approved: user.is_approved,
            is_suspended: user.is_suspended,
            suspension_reason: user.suspension_reason,
            is_deleted: user.is_deleted,
            verification_token: user.verification_token,
            approval_token: user.approval_token,
            reset_password_token: user.reset_password_token,
            reset_password_expires: user.reset_password_expires.map(to_bson_date),
            phone: user.phone,
            address: user.address,
            business_name: user.business_name,
            created_at: to_bson_date(user.created_at),
            updated_at: to_bson_date(user.updated_at),
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: Uuid::from_bytes(doc.id.bytes()),
            name: doc.name,
            email: doc.email,
            password_hash: doc.password_hash,
            role: doc.role,
            is_verified: doc.is_verified,
            is_approved: doc.is_approved,
            is_suspended: doc.is_suspended,
            suspension_reason: doc.suspension_reason,
            is_deleted: doc.is_deleted,
            verification_token: doc.verification_token,
            approval_token: doc.approval_token,
            reset_password_token: doc.reset_password_token,
            reset_password_expires: doc.reset_password_expires.map(from_bson_date),
            phone: doc.phone,
            address: doc.address,
            business_name: doc.business_name,
            created_at: from_bson_date(doc.created_at),
            updated_at: from_bson_date(doc.updated_at),
        }
    }
}

fn optional<T: Into<Bson>>(value: Option<T>) -> Bson {
    value.map(Into::into).unwrap_or(Bson::Null)
}

/// MongoDB implementation of the UserRepository
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, USERS_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<UserDocument>(collection_name),
        }
    }

    /// Create the unique email index and the lookup indexes. Idempotent.
    pub async fn init_indexes(&self) -> UserResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        let mut indexes = vec![
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique)
                .build(),
        ];
        for field in [
            "role",
            "is_verified",
            "is_deleted",
            "verification_token",
            "reset_password_token",
        ] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            indexes.push(IndexModel::builder().keys(keys).build());
        }

        self.collection.create_indexes(indexes).await?;
        tracing::info!(collection = %self.collection.name(), "User indexes ensured");
        Ok(())
    }

    fn live_by_id(id: Uuid) -> Document {
        doc! { "_id": to_bson_uuid(id), "is_deleted": false }
    }

    /// Build a MongoDB filter document from UserFilter
    fn build_filter(filter: &UserFilter) -> Document {
        let mut doc = doc! { "is_deleted": false };

        if let Some(role) = filter.role {
            doc.insert("role", role.to_string());
        }

        if let Some(verified) = filter.is_verified {
            doc.insert("is_verified", verified);
        }

        if let Some(ref search) = filter.search {
            let pattern = regex::escape(search);
            doc.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": &pattern, "$options": "i" } },
                    doc! { "email": { "$regex": &pattern, "$options": "i" } },
                    doc! { "phone": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }

        doc
    }

    fn build_set(patch: UserPatch) -> Document {
        let mut set = doc! { "updated_at": to_bson_date(Utc::now()) };

        if let Some(name) = patch.name {
            set.insert("name", name);
        }
        if let Some(phone) = patch.phone {
            set.insert("phone", optional(phone));
        }
        if let Some(address) = patch.address {
            set.insert("address", optional(address));
        }
        if let Some(role) = patch.role {
            set.insert("role", role.to_string());
        }
        if let Some(is_verified) = patch.is_verified {
            set.insert("is_verified", is_verified);
        }
        if let Some(is_approved) = patch.is_approved {
            set.insert("is_approved", optional(is_approved));
        }
        if let Some(is_suspended) = patch.is_suspended {
            set.insert("is_suspended", is_suspended);
        }
        if let Some(reason) = patch.suspension_reason {
            set.insert("suspension_reason", optional(reason));
        }
        if let Some(is_deleted) = patch.is_deleted {
            set.insert("is_deleted", is_deleted);
        }
        if let Some(token) = patch.approval_token {
            set.insert("approval_token", optional(token));
        }
        if let Some(token) = patch.reset_password_token {
            set.insert("reset_password_token", optional(token));
        }
        if let Some(expires) = patch.reset_password_expires {
            set.insert("reset_password_expires", optional(expires.map(to_bson_date)));
        }

        set
    }

    /// Atomically apply `$set: set` to the first document matching `filter`
    async fn find_and_set(&self, filter: Document, set: Document) -> UserResult<Option<User>> {
        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(User::from))
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, role = %user.role))]
    async fn create(&self, mut user: User) -> UserResult<User> {
        user.email = normalize_email(&user.email);

        match self
            .collection
            .insert_one(UserDocument::from(user.clone()))
            .await
        {
            Ok(_) => {
                tracing::info!("User created successfully");
                Ok(user)
            }
            Err(e) if is_duplicate_key(&e) => Err(UserError::DuplicateEmail(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let filter = doc! { "email": normalize_email(email), "is_deleted": false };
        let user = self.collection.find_one(filter).await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let user = self.collection.find_one(Self::live_by_id(id)).await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: UserPatch) -> UserResult<User> {
        let updated = self
            .find_and_set(Self::live_by_id(id), Self::build_set(patch))
            .await?
            .ok_or(UserError::NotFound(id))?;

        tracing::info!(user_id = %id, "User updated successfully");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let cursor = self
            .collection
            .find(Self::build_filter(&filter))
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(filter.offset())
            .limit(i64::try_from(filter.limit).unwrap_or(i64::MAX))
            .await?;
        let docs: Vec<UserDocument> = cursor.try_collect().await?;

        Ok(docs.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        let count = self
            .collection
            .count_documents(Self::build_filter(&filter))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, email, token))]
    async fn consume_verification_token(
        &self,
        email: &str,
        token: &str,
    ) -> UserResult<Option<User>> {
        let filter = doc! {
            "email": normalize_email(email),
            "verification_token": token,
            "is_deleted": false,
        };
        let set = doc! {
            "is_verified": true,
            "verification_token": Bson::Null,
            "updated_at": to_bson_date(Utc::now()),
        };
        self.find_and_set(filter, set).await
    }

    #[instrument(skip(self, token))]
    async fn consume_approval_token(&self, id: Uuid, token: &str) -> UserResult<Option<User>> {
        let mut filter = Self::live_by_id(id);
        filter.insert("approval_token", token);
        let set = doc! {
            "is_verified": true,
            "approval_token": Bson::Null,
            "updated_at": to_bson_date(Utc::now()),
        };
        self.find_and_set(filter, set).await
    }

    #[instrument(skip_all)]
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> UserResult<Option<User>> {
        let filter = doc! {
            "reset_password_token": token,
            "reset_password_expires": { "$gt": to_bson_date(now) },
            "is_deleted": false,
        };
        let set = doc! {
            "password_hash": password_hash,
            "reset_password_token": Bson::Null,
            "reset_password_expires": Bson::Null,
            "updated_at": to_bson_date(now),
        };
        self.find_and_set(filter, set).await
    }
}
