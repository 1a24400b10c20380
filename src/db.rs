use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Identity, Profile, User, UserRegister};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open user store {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("user store {} is not a valid JSON array of users: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot write user store {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("user store lock was poisoned")]
    Poisoned,

    #[error("user {0} already exists")]
    Duplicate(Uuid),

    #[error("user {0} not found")]
    NotFound(Uuid),
}

/// One element of the store array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(
        default,
        serialize_with = "serialize_birth_date",
        deserialize_with = "deserialize_birth_date"
    )]
    pub birth_date: Option<NaiveDate>,
}

// The file format writes a missing birth date as the string "None".
const NO_BIRTH_DATE: &str = "None";

fn serialize_birth_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        Some(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
        None => serializer.serialize_str(NO_BIRTH_DATE),
    }
}

// `null` and "" are accepted as absent too.
fn deserialize_birth_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() || raw == NO_BIRTH_DATE => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(de::Error::custom),
    }
}

impl UserRecord {
    /// Builds a record from a signup payload; `password` is what gets persisted.
    pub fn from_registration(registration: UserRegister, password: String) -> Self {
        let (user, _) = registration.into_parts();
        UserRecord {
            user_id: user.identity.user_id,
            email: user.identity.email,
            password,
            first_name: user.profile.first_name,
            last_name: user.profile.last_name,
            birth_date: user.profile.birth_date,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            identity: Identity {
                user_id: record.user_id,
                email: record.email,
            },
            profile: Profile {
                first_name: record.first_name,
                last_name: record.last_name,
                birth_date: record.birth_date,
            },
        }
    }
}

/// Storage for user records. Implementations are blocking; call them from
/// `web::block` inside handlers.
pub trait UserStore: Send + Sync {
    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError>;
    fn get(&self, user_id: Uuid) -> Result<UserRecord, StoreError>;
    fn list(&self) -> Result<Vec<UserRecord>, StoreError>;
    fn update(&self, record: UserRecord) -> Result<UserRecord, StoreError>;
    fn delete(&self, user_id: Uuid) -> Result<UserRecord, StoreError>;
}

fn insert_record(records: &mut Vec<UserRecord>, record: UserRecord) -> Result<UserRecord, StoreError> {
    if records.iter().any(|r| r.user_id == record.user_id) {
        return Err(StoreError::Duplicate(record.user_id));
    }
    records.push(record.clone());
    Ok(record)
}

fn find_record(records: &[UserRecord], user_id: Uuid) -> Result<UserRecord, StoreError> {
    records
        .iter()
        .find(|r| r.user_id == user_id)
        .cloned()
        .ok_or(StoreError::NotFound(user_id))
}

fn replace_record(records: &mut [UserRecord], record: UserRecord) -> Result<UserRecord, StoreError> {
    let slot = records
        .iter_mut()
        .find(|r| r.user_id == record.user_id)
        .ok_or(StoreError::NotFound(record.user_id))?;
    *slot = record.clone();
    Ok(record)
}

fn remove_record(records: &mut Vec<UserRecord>, user_id: Uuid) -> Result<UserRecord, StoreError> {
    let index = records
        .iter()
        .position(|r| r.user_id == user_id)
        .ok_or(StoreError::NotFound(user_id))?;
    Ok(records.remove(index))
}

/// A JSON file holding an array of user records.
///
/// Every operation reads the whole file under one lock; mutations write the
/// new array to a temporary sibling file and rename it over the store, so a
/// crash mid-write leaves the previous contents intact.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating it with an empty array if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = JsonFileStore {
            path: path.into(),
            lock: Mutex::new(()),
        };
        if !store.path.exists() {
            info!("Creating empty user store at {}", store.path.display());
            if let Some(dir) = store.dir().filter(|d| !d.exists()) {
                fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                    path: store.path.clone(),
                    source,
                })?;
            }
            store.save(&[])?;
        }
        let count = store.load()?.len();
        debug!("User store {} holds {} users", store.path.display(), count);
        Ok(store)
    }

    fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|d| !d.as_os_str().is_empty())
    }

    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let file = File::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(self.dir().unwrap_or_else(|| Path::new(".")))
            .map_err(write_err)?;
        serde_json::to_writer_pretty(&mut tmp, records)
            .map_err(|e| write_err(io::Error::new(ErrorKind::Other, e)))?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&[UserRecord]) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        f(&self.load()?)
    }

    fn modify<T>(
        &self,
        f: impl FnOnce(&mut Vec<UserRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut records = self.load()?;
        let out = f(&mut records)?;
        self.save(&records)?;
        Ok(out)
    }
}

impl UserStore for JsonFileStore {
    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        self.modify(|records| insert_record(records, record))
    }

    fn get(&self, user_id: Uuid) -> Result<UserRecord, StoreError> {
        self.read(|records| find_record(records, user_id))
    }

    fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.read(|records| Ok(records.to_vec()))
    }

    fn update(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        self.modify(|records| replace_record(records, record))
    }

    fn delete(&self, user_id: Uuid) -> Result<UserRecord, StoreError> {
        self.modify(|records| remove_record(records, user_id))
    }
}

/// In-process store with the same semantics as [`JsonFileStore`].
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<UserRecord>>,
}

impl UserStore for MemoryStore {
    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        insert_record(&mut records, record)
    }

    fn get(&self, user_id: Uuid) -> Result<UserRecord, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        find_record(&records, user_id)
    }

    fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }

    fn update(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        replace_record(&mut records, record)
    }

    fn delete(&self, user_id: Uuid) -> Result<UserRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        remove_record(&mut records, user_id)
    }
}

pub fn create_store(config: &Config) -> Result<Arc<dyn UserStore>, StoreError> {
    let store = JsonFileStore::open(&config.store_path)?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    fn record(name: &str) -> UserRecord {
        UserRecord {
            user_id: Uuid::new_v4(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "secret-hash".to_string(),
            first_name: name.to_string(),
            last_name: "Lee".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2000, 1, 1),
        }
    }

    fn temp_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_an_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list().unwrap().is_empty());
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!([]));
    }

    #[test]
    fn open_rejects_a_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{not json").unwrap();
        let err = JsonFileStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("users.json"));
    }

    #[test]
    fn records_are_written_with_string_ids_and_dates() {
        let (dir, store) = temp_store();
        let ann = record("Ann");
        let mut bob = record("Bob");
        bob.birth_date = None;
        store.create(ann.clone()).unwrap();
        store.create(bob.clone()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("users.json")).unwrap(),
        )
        .unwrap();
        let rows = raw.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["user_id"], json!(ann.user_id.to_string()));
        assert_eq!(rows[0]["birth_date"], json!("2000-01-01"));
        assert_eq!(rows[0]["password"], json!("secret-hash"));
        assert_eq!(rows[1]["birth_date"], json!("None"));

        let reread = store.list().unwrap();
        assert_eq!(reread[1].birth_date, None);
    }

    #[test]
    fn null_birth_date_is_read_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(
            &path,
            r#"[{"user_id":"11111111-1111-1111-1111-111111111111","email":"a@example.com",
                "password":"longenough","first_name":"Ann","last_name":"Lee","birth_date":null}]"#,
        )
        .unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap()[0].birth_date, None);
    }

    #[test]
    fn none_birth_date_is_read_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(
            &path,
            r#"[{"user_id":"11111111-1111-1111-1111-111111111111","email":"a@example.com",
                "password":"longenough","first_name":"Ann","last_name":"Lee","birth_date":"None"}]"#,
        )
        .unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        let users = store.list().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].birth_date, None);
    }

    #[test]
    fn duplicate_ids_are_rejected_without_writing() {
        let (_dir, store) = temp_store();
        let ann = record("Ann");
        store.create(ann.clone()).unwrap();
        let err = store.create(ann.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == ann.user_id));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn crud_round_trip() {
        let (_dir, store) = temp_store();
        let ann = record("Ann");
        store.create(ann.clone()).unwrap();
        assert_eq!(store.get(ann.user_id).unwrap(), ann);

        let mut renamed = ann.clone();
        renamed.last_name = "Park".to_string();
        store.update(renamed.clone()).unwrap();
        assert_eq!(store.get(ann.user_id).unwrap().last_name, "Park");

        assert_eq!(store.delete(ann.user_id).unwrap(), renamed);
        assert!(matches!(
            store.get(ann.user_id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update(renamed),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn missing_file_after_open_is_reported() {
        let (dir, store) = temp_store();
        fs::remove_file(dir.path().join("users.json")).unwrap();
        let err = store.create(record("Ann")).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }

    #[test]
    fn concurrent_creates_keep_every_record() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..24)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || store.create(record(&format!("User{}", i))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 24);
    }

    #[test]
    fn memory_store_matches_file_semantics() {
        let store = MemoryStore::default();
        let ann = record("Ann");
        store.create(ann.clone()).unwrap();
        assert!(matches!(
            store.create(ann.clone()),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.list().unwrap(), vec![ann.clone()]);
        assert_eq!(store.delete(ann.user_id).unwrap(), ann);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn record_converts_to_public_user() {
        let ann = record("Ann");
        let user = User::from(ann.clone());
        assert_eq!(user.identity.user_id, ann.user_id);
        assert_eq!(user.profile.first_name, "Ann");
        assert_eq!(user.profile.birth_date, ann.birth_date);
    }
}
