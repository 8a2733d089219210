//! User registration, authentication, and roster queries
//!
//! Passwords are stored as salted SHA-256 digests. This is deliberately
//! lightweight: the application is local-first and the hash only keeps
//! plain text out of the stored records.

use crate::models::{from_record, from_records, to_record, Usuario};
use crate::store::{conditions, DocumentStore, Record};
use crate::{Error, Result};
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Storage key for the user collection
pub const COLLECTION: &str = "usuarios";

// ========================================
// Password Hashing
// ========================================

fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hash_senha(salt: &str, senha: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(senha.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ========================================
// Operations
// ========================================

/// Register a new user
///
/// The email is normalized (trimmed, lowercased) and must not already be
/// registered. The new user belongs to no ministry until an invite PIN
/// is redeemed.
pub async fn register(
    store: &DocumentStore,
    nome: &str,
    email: &str,
    senha: &str,
) -> Result<Usuario> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(Error::InvalidInput("email must not be empty".to_string()));
    }
    if senha.is_empty() {
        return Err(Error::InvalidInput("password must not be empty".to_string()));
    }
    if find_by_email(store, &email).await.is_some() {
        return Err(Error::InvalidInput(format!(
            "email '{}' is already registered",
            email
        )));
    }

    let salt = generate_salt();
    let usuario = Usuario {
        id: Uuid::new_v4().to_string(),
        nome: nome.trim().to_string(),
        email,
        senha_hash: hash_senha(&salt, senha),
        senha_salt: salt,
        ministerio_id: None,
        funcao: None,
        criado_em: Utc::now(),
    };

    store.create_record(COLLECTION, to_record(&usuario)?).await;
    Ok(usuario)
}

/// Look up a user by email
pub async fn find_by_email(store: &DocumentStore, email: &str) -> Option<Usuario> {
    let email = normalize_email(email);
    let records = store
        .find_records(COLLECTION, &conditions(&[("email", json!(email))]))
        .await;
    records
        .into_iter()
        .next()
        .and_then(|record| from_record(record).ok())
}

/// Check a user's credentials
///
/// Unknown email and wrong password both yield `None`; callers cannot
/// tell which it was.
pub async fn authenticate(store: &DocumentStore, email: &str, senha: &str) -> Option<Usuario> {
    let usuario = find_by_email(store, email).await?;
    if hash_senha(&usuario.senha_salt, senha) == usuario.senha_hash {
        Some(usuario)
    } else {
        None
    }
}

/// Update a user's profile fields
///
/// Only the supplied fields change; everything else is retained.
/// Returns `false` when the user does not exist.
pub async fn update_perfil(
    store: &DocumentStore,
    usuario_id: &str,
    nome: Option<&str>,
    funcao: Option<&str>,
) -> bool {
    let mut patch = Record::new();
    if let Some(nome) = nome {
        patch.insert("nome".to_string(), json!(nome));
    }
    if let Some(funcao) = funcao {
        patch.insert("funcao".to_string(), json!(funcao));
    }
    store.update_record(COLLECTION, usuario_id, &patch).await
}

/// All users belonging to a ministry, in insertion order
pub async fn list_by_ministerio(store: &DocumentStore, ministerio_id: &str) -> Vec<Usuario> {
    let records = store
        .find_records(
            COLLECTION,
            &conditions(&[("ministerioId", json!(ministerio_id))]),
        )
        .await;
    from_records(records)
}
