//! SQLite persistence for the catalog.
//!
//! One connection behind an async mutex, locked per call; multi-statement
//! writes (inline review rows, junction replacement) run inside explicit
//! transactions. Referential integrity is the schema's job: foreign keys
//! are switched on for the connection and deletes cascade from a variety
//! to its reviews, its certificate and its store associations.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::certificate::Certificate;
use crate::models::chai::{Chai, ChaiFields, ChaiType};
use crate::models::review::{NewReview, Review, ReviewEdit};
use crate::models::store::Store;
use crate::models::user::User;

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_db() -> Database {
        let db = Database::new(Path::new(":memory:")).unwrap();
        db.create_schema().await.unwrap();
        db
    }

    fn fields(name: &str, chai_type: ChaiType) -> ChaiFields {
        ChaiFields {
            name: name.to_string(),
            image: String::new(),
            chai_type,
            description: "Delicious Chai".to_string(),
            price: 20.0,
        }
    }

    async fn admin_id(db: &Database) -> i64 {
        db.list_users().await.unwrap()[0].id
    }

    #[tokio::test]
    async fn test_schema_creation() {
        let db = create_test_db().await;

        let conn = db.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for table in [
            "users",
            "chai_varieties",
            "chai_reviews",
            "stores",
            "store_varieties",
            "chai_certificates",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_seeded_admin_user() {
        let db = create_test_db().await;
        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");

        // Schema creation is idempotent, including the seed row.
        db.create_schema().await.unwrap();
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chai_lifecycle() {
        let db = create_test_db().await;

        let created = db
            .create_chai(&fields("Masala Classic", ChaiType::Masala), &[])
            .await
            .unwrap();
        assert!(created.id > 0);

        let fetched = db.get_chai(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Masala Classic");
        assert_eq!(fetched.chai_type, ChaiType::Masala);
        assert_eq!(fetched.description, "Delicious Chai");
        assert_eq!(fetched.price, 20.0);
        assert_eq!(fetched.date_added, created.date_added);

        let mut updated = fields("Masala Royale", ChaiType::Masala);
        updated.price = 25.0;
        db.update_chai(created.id, &updated, &[], &[]).await.unwrap();
        let fetched = db.get_chai(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Masala Royale");
        assert_eq!(fetched.price, 25.0);

        db.delete_chai(created.id).await.unwrap();
        assert!(db.get_chai(created.id).await.unwrap().is_none());
        assert!(matches!(
            db.delete_chai(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_matches_stored_count() {
        let db = create_test_db().await;
        assert!(db.list_chais().await.unwrap().is_empty());

        db.create_chai(&fields("Ginger", ChaiType::Ginger), &[])
            .await
            .unwrap();
        db.create_chai(&fields("Plain", ChaiType::Plain), &[])
            .await
            .unwrap();
        db.create_chai(&fields("Elachi", ChaiType::Elachi), &[])
            .await
            .unwrap();

        let chais = db.list_chais().await.unwrap();
        assert_eq!(chais.len(), 3);
        // Stable id order for the listing page.
        assert!(chais.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_inline_review_rows() {
        let db = create_test_db().await;
        let user = admin_id(&db).await;

        let chai = db
            .create_chai(
                &fields("Kiwi", ChaiType::Kiwi),
                &[NewReview {
                    user_id: user,
                    rating: 4,
                    comment: "Surprisingly good".to_string(),
                }],
            )
            .await
            .unwrap();

        let reviews = db.reviews_for_chai(chai.id).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 4);
        assert_eq!(reviews[0].username, "admin");

        // Edit the existing row and add another in the same save.
        db.update_chai(
            chai.id,
            &fields("Kiwi", ChaiType::Kiwi),
            &[ReviewEdit {
                id: reviews[0].id,
                user_id: user,
                rating: 5,
                comment: "Upgraded opinion".to_string(),
                delete: false,
            }],
            &[NewReview {
                user_id: user,
                rating: 2,
                comment: "Second thoughts".to_string(),
            }],
        )
        .await
        .unwrap();

        let reviews = db.reviews_for_chai(chai.id).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].rating, 5);
        assert_eq!(reviews[0].comment, "Upgraded opinion");

        // Tick the delete box on the first row.
        db.update_chai(
            chai.id,
            &fields("Kiwi", ChaiType::Kiwi),
            &[ReviewEdit {
                id: reviews[0].id,
                user_id: user,
                rating: 5,
                comment: String::new(),
                delete: true,
            }],
            &[],
        )
        .await
        .unwrap();
        assert_eq!(db.reviews_for_chai(chai.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_review_requires_existing_user() {
        let db = create_test_db().await;
        let result = db
            .create_chai(
                &fields("Plain", ChaiType::Plain),
                &[NewReview {
                    user_id: 9999,
                    rating: 3,
                    comment: "ghost reviewer".to_string(),
                }],
            )
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        // The failed transaction rolled the variety back too.
        assert!(db.list_chais().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_associations_are_symmetric() {
        let db = create_test_db().await;
        let masala = db
            .create_chai(&fields("Masala", ChaiType::Masala), &[])
            .await
            .unwrap();
        let ginger = db
            .create_chai(&fields("Ginger", ChaiType::Ginger), &[])
            .await
            .unwrap();
        let store = db
            .create_store("Chai Point", "Indiranagar", &[masala.id, ginger.id])
            .await
            .unwrap();

        let stocked = db.varieties_for_store(store.id).await.unwrap();
        assert_eq!(stocked.len(), 2);
        assert_eq!(db.stores_for_chai(masala.id).await.unwrap().len(), 1);
        assert_eq!(db.stores_for_chai(ginger.id).await.unwrap()[0].name, "Chai Point");

        // Saving the form again replaces the association set.
        db.update_store(store.id, "Chai Point", "Indiranagar", &[ginger.id])
            .await
            .unwrap();
        assert_eq!(db.varieties_for_store(store.id).await.unwrap().len(), 1);
        assert!(db.stores_for_chai(masala.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let db = create_test_db().await;
        let store = db.create_store("Tapri", "Law Garden", &[]).await.unwrap();

        db.update_store(store.id, "Tapri The Tea House", "Law Garden", &[])
            .await
            .unwrap();
        let fetched = db.get_store(store.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Tapri The Tea House");

        db.delete_store(store.id).await.unwrap();
        assert!(db.get_store(store.id).await.unwrap().is_none());
        assert!(matches!(
            db.update_store(store.id, "x", "y", &[]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_save_rolls_back_on_unknown_variety() {
        let db = create_test_db().await;
        let chai = db
            .create_chai(&fields("Masala", ChaiType::Masala), &[])
            .await
            .unwrap();

        // A variety id that no longer exists trips the junction foreign key;
        // the store row must not land without its associations.
        let result = db.create_store("Ghost Stock", "Nowhere", &[9999]).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(db.list_stores().await.unwrap().is_empty());

        let store = db
            .create_store("Chai Point", "Indiranagar", &[chai.id])
            .await
            .unwrap();
        let result = db
            .update_store(store.id, "Chai Point II", "Koramangala", &[9999])
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        // The failed save left fields and associations alone.
        let fetched = db.get_store(store.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Chai Point");
        assert_eq!(db.varieties_for_store(store.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_certificate_unique_per_variety() {
        let db = create_test_db().await;
        let chai = db
            .create_chai(&fields("Masala", ChaiType::Masala), &[])
            .await
            .unwrap();
        let issued = Utc::now();
        let valid_until = issued + chrono::Duration::days(365);

        db.insert_certificate(chai.id, "FSSAI-001", issued, valid_until)
            .await
            .unwrap();
        let second = db
            .insert_certificate(chai.id, "FSSAI-002", issued, valid_until)
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let certs = db.list_certificates().await.unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].certificate_number, "FSSAI-001");
        assert_eq!(certs[0].chai_name, "Masala");

        // The same uniqueness guards the update path.
        let ginger = db
            .create_chai(&fields("Ginger", ChaiType::Ginger), &[])
            .await
            .unwrap();
        let other = db
            .insert_certificate(ginger.id, "FSSAI-003", issued, valid_until)
            .await
            .unwrap();
        let moved = db
            .update_certificate(other, chai.id, "FSSAI-003", issued, valid_until)
            .await;
        assert!(matches!(moved, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let db = Database::new(&path).unwrap();
            db.create_schema().await.unwrap();
            db.create_chai(&fields("Masala", ChaiType::Masala), &[])
                .await
                .unwrap();
        }

        let db = Database::new(&path).unwrap();
        db.create_schema().await.unwrap();
        let chais = db.list_chais().await.unwrap();
        assert_eq!(chais.len(), 1);
        assert_eq!(chais[0].name, "Masala");
    }

    #[tokio::test]
    async fn test_cascade_delete() {
        let db = create_test_db().await;
        let user = admin_id(&db).await;
        let chai = db
            .create_chai(
                &fields("Masala", ChaiType::Masala),
                &[NewReview {
                    user_id: user,
                    rating: 5,
                    comment: "the one".to_string(),
                }],
            )
            .await
            .unwrap();
        let store = db
            .create_store("Chai Point", "Indiranagar", &[chai.id])
            .await
            .unwrap();
        let issued = Utc::now();
        db.insert_certificate(chai.id, "FSSAI-001", issued, issued + chrono::Duration::days(90))
            .await
            .unwrap();

        db.delete_chai(chai.id).await.unwrap();

        assert!(db.reviews_for_chai(chai.id).await.unwrap().is_empty());
        assert!(db.certificate_for_chai(chai.id).await.unwrap().is_none());
        assert!(db.list_certificates().await.unwrap().is_empty());
        assert!(db.varieties_for_store(store.id).await.unwrap().is_empty());
        // The store itself is untouched.
        assert!(db.get_store(store.id).await.unwrap().is_some());
    }
}

/// Handle on the SQLite store. Cloning shares the same connection; every
/// method locks it for the duration of the call.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        // Cascades in the schema only fire with foreign keys switched on.
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        info!("database connection established at {}", path.display());
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the schema if it is not there yet. Safe to call on every
    /// startup; the seed row is inserted with OR IGNORE.
    pub async fn create_schema(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().await;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE
            );
            INSERT OR IGNORE INTO users (username) VALUES ('admin');",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chai_varieties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                image TEXT NOT NULL DEFAULT '',
                date_added TEXT NOT NULL,
                type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT 'Delicious Chai',
                price REAL NOT NULL DEFAULT 20.0
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chai_reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chai_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT NOT NULL,
                date_added TEXT NOT NULL,
                FOREIGN KEY (chai_id) REFERENCES chai_varieties(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                location TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS store_varieties (
                store_id INTEGER NOT NULL,
                chai_id INTEGER NOT NULL,
                PRIMARY KEY (store_id, chai_id),
                FOREIGN KEY (store_id) REFERENCES stores(id) ON DELETE CASCADE,
                FOREIGN KEY (chai_id) REFERENCES chai_varieties(id) ON DELETE CASCADE
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chai_certificates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chai_id INTEGER NOT NULL UNIQUE,
                certificate_number TEXT NOT NULL,
                issued_date TEXT NOT NULL,
                valid_until TEXT NOT NULL,
                FOREIGN KEY (chai_id) REFERENCES chai_varieties(id) ON DELETE CASCADE
            );",
        )?;

        debug!("schema ready");
        Ok(())
    }

    // ----- varieties -----

    /// Insert a variety together with any filled inline review rows, in one
    /// transaction. Returns the hydrated row so callers can use the new id
    /// without re-querying.
    pub async fn create_chai(
        &self,
        fields: &ChaiFields,
        reviews: &[NewReview],
    ) -> Result<Chai, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let date_added = Utc::now();

        tx.execute(
            "INSERT INTO chai_varieties (name, image, date_added, type, description, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fields.name,
                fields.image,
                date_added,
                fields.chai_type.code(),
                fields.description,
                fields.price
            ],
        )?;
        let id = tx.last_insert_rowid();

        for review in reviews {
            insert_review(&tx, id, review)?;
        }

        tx.commit()?;
        debug!("inserted chai variety {id} ({})", fields.name);
        Ok(Chai {
            id,
            name: fields.name.clone(),
            image: fields.image.clone(),
            date_added,
            chai_type: fields.chai_type,
            description: fields.description.clone(),
            price: fields.price,
        })
    }

    pub async fn list_chais(&self) -> Result<Vec<Chai>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, image, date_added, type, description, price
             FROM chai_varieties ORDER BY id",
        )?;
        let chais = stmt
            .query_map([], row_to_chai)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("fetched {} chai varieties", chais.len());
        Ok(chais)
    }

    pub async fn get_chai(&self, id: i64) -> Result<Option<Chai>, AppError> {
        let conn = self.conn.lock().await;
        let chai = conn
            .query_row(
                "SELECT id, name, image, date_added, type, description, price
                 FROM chai_varieties WHERE id = ?1",
                params![id],
                row_to_chai,
            )
            .optional()?;
        Ok(chai)
    }

    /// Save the variety form: field update plus the inline review rows
    /// (edits, deletions, filled blanks), all or nothing.
    pub async fn update_chai(
        &self,
        id: i64,
        fields: &ChaiFields,
        edits: &[ReviewEdit],
        new_reviews: &[NewReview],
    ) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE chai_varieties
             SET name = ?1, image = ?2, type = ?3, description = ?4, price = ?5
             WHERE id = ?6",
            params![
                fields.name,
                fields.image,
                fields.chai_type.code(),
                fields.description,
                fields.price,
                id
            ],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("no chai variety with id {id}")));
        }

        for edit in edits {
            if edit.delete {
                tx.execute(
                    "DELETE FROM chai_reviews WHERE id = ?1 AND chai_id = ?2",
                    params![edit.id, id],
                )?;
            } else {
                tx.execute(
                    "UPDATE chai_reviews SET user_id = ?1, rating = ?2, comment = ?3
                     WHERE id = ?4 AND chai_id = ?5",
                    params![edit.user_id, edit.rating, edit.comment, edit.id, id],
                )?;
            }
        }
        for review in new_reviews {
            insert_review(&tx, id, review)?;
        }

        tx.commit()?;
        debug!("updated chai variety {id}");
        Ok(())
    }

    /// Delete a variety. The schema cascades to its reviews, certificate and
    /// store associations, so no manual cleanup here.
    pub async fn delete_chai(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM chai_varieties WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("no chai variety with id {id}")));
        }
        debug!("deleted chai variety {id}");
        Ok(())
    }

    // ----- reviews -----

    pub async fn reviews_for_chai(&self, chai_id: i64) -> Result<Vec<Review>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.chai_id, r.user_id, u.username, r.rating, r.comment, r.date_added
             FROM chai_reviews r
             JOIN users u ON u.id = r.user_id
             WHERE r.chai_id = ?1
             ORDER BY r.date_added, r.id",
        )?;
        let reviews = stmt
            .query_map(params![chai_id], |row| {
                Ok(Review {
                    id: row.get(0)?,
                    chai_id: row.get(1)?,
                    user_id: row.get(2)?,
                    username: row.get(3)?,
                    rating: row.get(4)?,
                    comment: row.get(5)?,
                    date_added: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    // ----- users -----

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, username FROM users ORDER BY username")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ----- stores -----

    /// Insert a store together with its variety associations, in one
    /// transaction. Returns the hydrated row so callers can use the new id
    /// without re-querying.
    pub async fn create_store(
        &self,
        name: &str,
        location: &str,
        chai_ids: &[i64],
    ) -> Result<Store, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO stores (name, location) VALUES (?1, ?2)",
            params![name, location],
        )?;
        let id = tx.last_insert_rowid();
        replace_store_varieties(&tx, id, chai_ids)?;

        tx.commit()?;
        debug!("inserted store {id} ({name})");
        Ok(Store {
            id,
            name: name.to_string(),
            location: location.to_string(),
        })
    }

    pub async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name, location FROM stores ORDER BY id")?;
        let stores = stmt
            .query_map([], row_to_store)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    pub async fn get_store(&self, id: i64) -> Result<Option<Store>, AppError> {
        let conn = self.conn.lock().await;
        let store = conn
            .query_row(
                "SELECT id, name, location FROM stores WHERE id = ?1",
                params![id],
                row_to_store,
            )
            .optional()?;
        Ok(store)
    }

    /// Save the store form: field update plus the variety associations, all
    /// or nothing.
    pub async fn update_store(
        &self,
        id: i64,
        name: &str,
        location: &str,
        chai_ids: &[i64],
    ) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE stores SET name = ?1, location = ?2 WHERE id = ?3",
            params![name, location, id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("no store with id {id}")));
        }
        replace_store_varieties(&tx, id, chai_ids)?;

        tx.commit()?;
        debug!("updated store {id}");
        Ok(())
    }

    pub async fn delete_store(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM stores WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("no store with id {id}")));
        }
        debug!("deleted store {id}");
        Ok(())
    }

    pub async fn varieties_for_store(&self, store_id: i64) -> Result<Vec<Chai>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.name, v.image, v.date_added, v.type, v.description, v.price
             FROM chai_varieties v
             JOIN store_varieties sv ON sv.chai_id = v.id
             WHERE sv.store_id = ?1
             ORDER BY v.name COLLATE NOCASE",
        )?;
        let chais = stmt
            .query_map(params![store_id], row_to_chai)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chais)
    }

    pub async fn stores_for_chai(&self, chai_id: i64) -> Result<Vec<Store>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.location
             FROM stores s
             JOIN store_varieties sv ON sv.store_id = s.id
             WHERE sv.chai_id = ?1
             ORDER BY s.name COLLATE NOCASE",
        )?;
        let stores = stmt
            .query_map(params![chai_id], row_to_store)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    // ----- certificates -----

    pub async fn insert_certificate(
        &self,
        chai_id: i64,
        certificate_number: &str,
        issued_date: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chai_certificates (chai_id, certificate_number, issued_date, valid_until)
             VALUES (?1, ?2, ?3, ?4)",
            params![chai_id, certificate_number, issued_date, valid_until],
        )
        .map_err(|err| map_certificate_conflict(err, chai_id))?;
        let id = conn.last_insert_rowid();
        debug!("inserted certificate {id} for chai variety {chai_id}");
        Ok(id)
    }

    pub async fn list_certificates(&self) -> Result<Vec<Certificate>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.chai_id, v.name, c.certificate_number, c.issued_date, c.valid_until
             FROM chai_certificates c
             JOIN chai_varieties v ON v.id = c.chai_id
             ORDER BY c.id",
        )?;
        let certs = stmt
            .query_map([], row_to_certificate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(certs)
    }

    pub async fn get_certificate(&self, id: i64) -> Result<Option<Certificate>, AppError> {
        let conn = self.conn.lock().await;
        let cert = conn
            .query_row(
                "SELECT c.id, c.chai_id, v.name, c.certificate_number, c.issued_date, c.valid_until
                 FROM chai_certificates c
                 JOIN chai_varieties v ON v.id = c.chai_id
                 WHERE c.id = ?1",
                params![id],
                row_to_certificate,
            )
            .optional()?;
        Ok(cert)
    }

    pub async fn certificate_for_chai(&self, chai_id: i64) -> Result<Option<Certificate>, AppError> {
        let conn = self.conn.lock().await;
        let cert = conn
            .query_row(
                "SELECT c.id, c.chai_id, v.name, c.certificate_number, c.issued_date, c.valid_until
                 FROM chai_certificates c
                 JOIN chai_varieties v ON v.id = c.chai_id
                 WHERE c.chai_id = ?1",
                params![chai_id],
                row_to_certificate,
            )
            .optional()?;
        Ok(cert)
    }

    pub async fn update_certificate(
        &self,
        id: i64,
        chai_id: i64,
        certificate_number: &str,
        issued_date: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE chai_certificates
                 SET chai_id = ?1, certificate_number = ?2, issued_date = ?3, valid_until = ?4
                 WHERE id = ?5",
                params![chai_id, certificate_number, issued_date, valid_until, id],
            )
            .map_err(|err| map_certificate_conflict(err, chai_id))?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("no certificate with id {id}")));
        }
        Ok(())
    }

    pub async fn delete_certificate(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM chai_certificates WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("no certificate with id {id}")));
        }
        debug!("deleted certificate {id}");
        Ok(())
    }
}

fn insert_review(
    tx: &rusqlite::Transaction<'_>,
    chai_id: i64,
    review: &NewReview,
) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO chai_reviews (chai_id, user_id, rating, comment, date_added)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![chai_id, review.user_id, review.rating, review.comment, Utc::now()],
    )?;
    Ok(())
}

/// Replace a store's variety associations with the submitted set, inside the
/// caller's transaction.
fn replace_store_varieties(
    tx: &rusqlite::Transaction<'_>,
    store_id: i64,
    chai_ids: &[i64],
) -> Result<(), rusqlite::Error> {
    tx.execute(
        "DELETE FROM store_varieties WHERE store_id = ?1",
        params![store_id],
    )?;
    for chai_id in chai_ids {
        // OR IGNORE drops duplicates in the submitted list; foreign key
        // failures for unknown varieties still surface.
        tx.execute(
            "INSERT OR IGNORE INTO store_varieties (store_id, chai_id) VALUES (?1, ?2)",
            params![store_id, chai_id],
        )?;
    }
    Ok(())
}

fn row_to_chai(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chai> {
    let code: String = row.get(4)?;
    let chai_type = ChaiType::from_code(&code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown chai type code {code:?}").into(),
        )
    })?;
    Ok(Chai {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        date_added: row.get(3)?,
        chai_type,
        description: row.get(5)?,
        price: row.get(6)?,
    })
}

fn row_to_store(row: &rusqlite::Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
    })
}

fn row_to_certificate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Certificate> {
    Ok(Certificate {
        id: row.get(0)?,
        chai_id: row.get(1)?,
        chai_name: row.get(2)?,
        certificate_number: row.get(3)?,
        issued_date: row.get(4)?,
        valid_until: row.get(5)?,
    })
}

/// The one-to-one between certificates and varieties is the UNIQUE column on
/// `chai_id`; a second certificate trips it and becomes a conflict the admin
/// can read. Other constraint failures pass through as database errors.
fn map_certificate_conflict(err: rusqlite::Error, chai_id: i64) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            AppError::Conflict(format!(
                "chai variety {chai_id} already has a certificate"
            ))
        }
        _ => AppError::Database(err),
    }
}
