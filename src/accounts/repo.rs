use rusqlite::params;
use tracing::info;
use uuid::Uuid;

use crate::db::{now_stamp, parse_stamp, Database};
use crate::error::{Error, Result};

use super::password;
use super::types::{Account, NewAdmin, NewStudent, ProfileChanges, Role};

/// Fixed bootstrap identity, created when no owner-role account exists.
pub const OWNER_ID: &str = "owner-1";
pub const OWNER_USERNAME: &str = "admin";
pub const OWNER_PASSWORD: &str = "admin123";
const OWNER_NAME: &str = "Owner";

const ACCOUNT_COLUMNS: &str = "id, username, name, password, role, phone, created_at";

const INSERT_ACCOUNT: &str = "INSERT INTO accounts \
    (id, username, name, password, role, phone, created_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const UPDATE_PROFILE: &str =
    "UPDATE accounts SET name = ?1, password = ?2, phone = ?3 WHERE id = ?4";

const COUNT_OWNERS: &str = "SELECT count(*) FROM accounts WHERE role = 'owner'";

/// Loosely-typed mirror of one `accounts` row; decoded exactly once before
/// anything leaves this module.
struct AccountRow {
    id: String,
    username: String,
    name: String,
    password: String,
    role: String,
    phone: Option<String>,
    created_at: String,
}

impl AccountRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            name: row.get(2)?,
            password: row.get(3)?,
            role: row.get(4)?,
            phone: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            username: self.username,
            name: self.name,
            password_hash: self.password,
            role: Role::parse(&self.role)?,
            phone: self.phone,
            created_at: parse_stamp(&self.created_at)?,
        })
    }
}

fn find_row_by_username(db: &Database, username: &str) -> Result<Option<AccountRow>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1");
    db.query_row_opt(&sql, params![username], AccountRow::read)
}

fn find_row_by_id(db: &Database, id: &str) -> Result<Option<AccountRow>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    db.query_row_opt(&sql, params![id], AccountRow::read)
}

/// Login lookup. The username match is exact and case-sensitive; the
/// password is checked against the stored hash. Unknown username, wrong
/// password and an undecodable stored hash all come back as `None`.
pub fn find_by_credentials(db: &Database, username: &str, plain: &str) -> Result<Option<Account>> {
    let Some(row) = find_row_by_username(db, username)? else {
        return Ok(None);
    };
    if !password::verify(plain, &row.password) {
        return Ok(None);
    }
    row.decode().map(Some)
}

/// Creates a student account from a registration; the student's email is the
/// username.
pub async fn register(db: &Database, new: &NewStudent) -> Result<Account> {
    insert_account(
        db,
        Uuid::new_v4().to_string(),
        &new.email,
        &new.name,
        &new.password,
        Role::Student,
        new.phone.clone(),
    )
    .await
}

/// Owner-only creation of an admin account.
pub async fn create_admin(db: &Database, acting: &Account, new: &NewAdmin) -> Result<Account> {
    if acting.role != Role::Owner {
        return Err(Error::Unauthorized);
    }
    insert_account(
        db,
        Uuid::new_v4().to_string(),
        &new.username,
        &new.name,
        &new.password,
        Role::Admin,
        None,
    )
    .await
}

/// Applies only the fields present in `changes`; a changed password is
/// re-hashed. Fails with NotFound when the id is unknown.
pub async fn update_profile(db: &Database, id: &str, changes: &ProfileChanges) -> Result<Account> {
    let Some(row) = find_row_by_id(db, id)? else {
        return Err(Error::NotFound(id.to_owned()));
    };
    let current = row.decode()?;

    let name = changes.name.clone().unwrap_or_else(|| current.name.clone());
    let password_hash = match &changes.password {
        Some(plain) => password::hash(plain)?,
        None => current.password_hash.clone(),
    };
    let phone = changes.phone.clone().or_else(|| current.phone.clone());

    db.write(|engine| engine.execute(UPDATE_PROFILE, params![name, password_hash, phone, id]))
        .await?;
    Ok(Account {
        id: current.id,
        username: current.username,
        name,
        password_hash,
        role: current.role,
        phone,
        created_at: current.created_at,
    })
}

/// Admin listing, restricted to the owner. Anyone else sees nothing rather
/// than an error, matching how the listing is used for display.
pub fn list_admins(db: &Database, acting: &Account) -> Result<Vec<Account>> {
    if acting.role != Role::Owner {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = 'admin' ORDER BY created_at DESC"
    );
    let rows = db.query(&sql, [], AccountRow::read)?;
    rows.into_iter().map(AccountRow::decode).collect()
}

/// Inserts the fixed owner account unless an owner already exists. Runs on
/// every startup right after the database is ready.
pub async fn bootstrap_owner(db: &Database) -> Result<()> {
    let owners = db
        .query_row_opt(COUNT_OWNERS, [], |row| row.get::<_, i64>(0))?
        .unwrap_or(0);
    if owners > 0 {
        return Ok(());
    }
    let hash = password::hash(OWNER_PASSWORD)?;
    let created_at = now_stamp()?;
    db.write(|engine| {
        engine.execute(
            INSERT_ACCOUNT,
            params![
                OWNER_ID,
                OWNER_USERNAME,
                OWNER_NAME,
                hash,
                Role::Owner.as_str(),
                Option::<String>::None,
                created_at
            ],
        )
    })
    .await?;
    info!(username = OWNER_USERNAME, "bootstrap owner account created");
    Ok(())
}

async fn insert_account(
    db: &Database,
    id: String,
    username: &str,
    name: &str,
    plain: &str,
    role: Role,
    phone: Option<String>,
) -> Result<Account> {
    if find_row_by_username(db, username)?.is_some() {
        return Err(Error::DuplicateUsername(username.to_owned()));
    }
    let password_hash = password::hash(plain)?;
    let created_at = now_stamp()?;
    db.write(|engine| {
        engine.execute(
            INSERT_ACCOUNT,
            params![
                id,
                username,
                name,
                password_hash,
                role.as_str(),
                phone,
                created_at
            ],
        )
    })
    .await?;
    Ok(Account {
        id,
        username: username.to_owned(),
        name: name.to_owned(),
        password_hash,
        role,
        phone,
        created_at: parse_stamp(&created_at)?,
    })
}
