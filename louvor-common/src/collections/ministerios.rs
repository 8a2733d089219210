//! Ministry lifecycle, invite PINs, and membership
//!
//! A ministry is joined by redeeming its invite PIN, a six-character
//! uppercase alphanumeric code. Membership itself lives on the user
//! record (`ministerioId`); the ministry record only names the leader
//! and carries the PIN.

use crate::events::LouvorEvent;
use crate::models::{from_record, to_record, Ministerio, Usuario};
use crate::store::{conditions, DocumentStore, Record};
use crate::{Error, Result};
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

/// Storage key for the ministry collection
pub const COLLECTION: &str = "ministerios";

const PIN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PIN_LEN: usize = 6;

fn generate_pin() -> String {
    let mut rng = rand::thread_rng();
    (0..PIN_LEN)
        .map(|_| PIN_CHARSET[rng.gen_range(0..PIN_CHARSET.len())] as char)
        .collect()
}

async fn find_by_pin(store: &DocumentStore, pin: &str) -> Option<Ministerio> {
    let records = store
        .find_records(COLLECTION, &conditions(&[("pin", json!(pin))]))
        .await;
    records
        .into_iter()
        .next()
        .and_then(|record| from_record(record).ok())
}

/// Generate a PIN no existing ministry uses
async fn unused_pin(store: &DocumentStore) -> Result<String> {
    for _ in 0..32 {
        let pin = generate_pin();
        if find_by_pin(store, &pin).await.is_none() {
            return Ok(pin);
        }
    }
    Err(Error::Internal(
        "could not generate an unused invite PIN".to_string(),
    ))
}

/// Create a ministry led by `lider_id`
///
/// The creator's user record is patched to point at the new ministry.
/// A creator without a user record still gets the ministry; the patch
/// failure is only logged.
pub async fn create(
    store: &DocumentStore,
    nome: &str,
    igreja: Option<&str>,
    lider_id: &str,
) -> Result<Ministerio> {
    let nome = nome.trim();
    if nome.is_empty() {
        return Err(Error::InvalidInput(
            "ministry name must not be empty".to_string(),
        ));
    }

    let ministerio = Ministerio {
        id: Uuid::new_v4().to_string(),
        nome: nome.to_string(),
        igreja: igreja.map(|igreja| igreja.trim().to_string()),
        lider_id: lider_id.to_string(),
        pin: unused_pin(store).await?,
        criado_em: Utc::now(),
    };
    store
        .create_record(COLLECTION, to_record(&ministerio)?)
        .await;

    let mut patch = Record::new();
    patch.insert("ministerioId".to_string(), json!(ministerio.id));
    if !store
        .update_record(crate::collections::usuarios::COLLECTION, lider_id, &patch)
        .await
    {
        warn!(
            "Leader '{}' has no user record to attach to ministry '{}'",
            lider_id, ministerio.id
        );
    }

    Ok(ministerio)
}

/// Join the ministry whose invite PIN matches
///
/// Input is trimmed and uppercased before the lookup, so the PIN is
/// case-insensitive to type. On success the user's `ministerioId` is
/// patched and a `MemberJoined` event is emitted on the store's bus.
pub async fn join_by_pin(
    store: &DocumentStore,
    pin: &str,
    usuario_id: &str,
) -> Result<Ministerio> {
    let pin = pin.trim().to_uppercase();
    let ministerio = match find_by_pin(store, &pin).await {
        Some(ministerio) => ministerio,
        None => return Err(Error::NotFound(format!("no ministry with PIN '{}'", pin))),
    };

    let mut patch = Record::new();
    patch.insert("ministerioId".to_string(), json!(ministerio.id));
    if !store
        .update_record(crate::collections::usuarios::COLLECTION, usuario_id, &patch)
        .await
    {
        return Err(Error::NotFound(format!("usuario '{}'", usuario_id)));
    }

    store.events().emit_lossy(LouvorEvent::MemberJoined {
        ministerio_id: ministerio.id.clone(),
        usuario_id: usuario_id.to_string(),
        timestamp: Utc::now(),
    });

    Ok(ministerio)
}

/// Replace a ministry's invite PIN, invalidating the old one
pub async fn regenerate_pin(store: &DocumentStore, ministerio_id: &str) -> Result<String> {
    let pin = unused_pin(store).await?;

    let mut patch = Record::new();
    patch.insert("pin".to_string(), json!(pin));
    if !store.update_record(COLLECTION, ministerio_id, &patch).await {
        return Err(Error::NotFound(format!("ministerio '{}'", ministerio_id)));
    }

    Ok(pin)
}

/// Look up a ministry by id
pub async fn get(store: &DocumentStore, ministerio_id: &str) -> Option<Ministerio> {
    let records = store
        .find_records(COLLECTION, &conditions(&[("id", json!(ministerio_id))]))
        .await;
    records
        .into_iter()
        .next()
        .and_then(|record| from_record(record).ok())
}

/// The ministry's member roster
pub async fn membros(store: &DocumentStore, ministerio_id: &str) -> Vec<Usuario> {
    crate::collections::usuarios::list_by_ministerio(store, ministerio_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::usuarios;

    fn pin_is_well_formed(pin: &str) -> bool {
        pin.len() == PIN_LEN
            && pin
                .bytes()
                .all(|b| PIN_CHARSET.contains(&b))
    }

    #[test]
    fn test_generate_pin_shape() {
        for _ in 0..50 {
            let pin = generate_pin();
            assert!(pin_is_well_formed(&pin), "bad PIN: {}", pin);
        }
    }

    #[tokio::test]
    async fn test_create_assigns_pin_and_attaches_leader() {
        let store = DocumentStore::in_memory();
        let lider = usuarios::register(&store, "Ana", "ana@example.com", "s")
            .await
            .unwrap();

        let ministerio = create(&store, "Louvor Central", Some("Igreja Central"), &lider.id)
            .await
            .unwrap();

        assert!(pin_is_well_formed(&ministerio.pin));
        assert_eq!(ministerio.lider_id, lider.id);

        // The leader's user record now points at the ministry
        let atual = usuarios::find_by_email(&store, "ana@example.com")
            .await
            .unwrap();
        assert_eq!(atual.ministerio_id.as_deref(), Some(ministerio.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let store = DocumentStore::in_memory();
        let result = create(&store, "   ", None, "u1").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_join_by_pin() {
        let store = DocumentStore::in_memory();
        let lider = usuarios::register(&store, "Ana", "ana@example.com", "s")
            .await
            .unwrap();
        let ministerio = create(&store, "Louvor Central", None, &lider.id)
            .await
            .unwrap();
        let bea = usuarios::register(&store, "Bea", "bea@example.com", "s")
            .await
            .unwrap();

        let mut rx = store.events().subscribe();

        // PIN entry is forgiving about case and whitespace
        let typed = format!("  {}  ", ministerio.pin.to_lowercase());
        let joined = join_by_pin(&store, &typed, &bea.id).await.unwrap();
        assert_eq!(joined.id, ministerio.id);

        let atual = usuarios::find_by_email(&store, "bea@example.com")
            .await
            .unwrap();
        assert_eq!(atual.ministerio_id.as_deref(), Some(ministerio.id.as_str()));

        // A MemberJoined event was emitted alongside the store notifications
        let mut saw_member_joined = false;
        while let Ok(event) = rx.try_recv() {
            if let LouvorEvent::MemberJoined {
                ministerio_id,
                usuario_id,
                ..
            } = event
            {
                assert_eq!(ministerio_id, ministerio.id);
                assert_eq!(usuario_id, bea.id);
                saw_member_joined = true;
            }
        }
        assert!(saw_member_joined);
    }

    #[tokio::test]
    async fn test_join_by_pin_rejects_unknown_pin() {
        let store = DocumentStore::in_memory();
        let bea = usuarios::register(&store, "Bea", "bea@example.com", "s")
            .await
            .unwrap();

        let result = join_by_pin(&store, "ZZZZZZ", &bea.id).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        // No membership was written
        let atual = usuarios::find_by_email(&store, "bea@example.com")
            .await
            .unwrap();
        assert_eq!(atual.ministerio_id, None);
    }

    #[tokio::test]
    async fn test_join_by_pin_rejects_unknown_user() {
        let store = DocumentStore::in_memory();
        let lider = usuarios::register(&store, "Ana", "ana@example.com", "s")
            .await
            .unwrap();
        let ministerio = create(&store, "Louvor Central", None, &lider.id)
            .await
            .unwrap();

        let result = join_by_pin(&store, &ministerio.pin, "desconhecido").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_regenerate_pin_invalidates_old_one() {
        let store = DocumentStore::in_memory();
        let lider = usuarios::register(&store, "Ana", "ana@example.com", "s")
            .await
            .unwrap();
        let ministerio = create(&store, "Louvor Central", None, &lider.id)
            .await
            .unwrap();
        let bea = usuarios::register(&store, "Bea", "bea@example.com", "s")
            .await
            .unwrap();

        let novo_pin = regenerate_pin(&store, &ministerio.id).await.unwrap();
        assert!(pin_is_well_formed(&novo_pin));
        assert_ne!(novo_pin, ministerio.pin);

        // The old PIN no longer joins; the new one does
        assert!(join_by_pin(&store, &ministerio.pin, &bea.id).await.is_err());
        assert!(join_by_pin(&store, &novo_pin, &bea.id).await.is_ok());

        assert!(matches!(
            regenerate_pin(&store, "desconhecido").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_membros() {
        let store = DocumentStore::in_memory();
        let lider = usuarios::register(&store, "Ana", "ana@example.com", "s")
            .await
            .unwrap();
        let ministerio = create(&store, "Louvor Central", None, &lider.id)
            .await
            .unwrap();
        let bea = usuarios::register(&store, "Bea", "bea@example.com", "s")
            .await
            .unwrap();
        join_by_pin(&store, &ministerio.pin, &bea.id).await.unwrap();

        let found = get(&store, &ministerio.id).await.unwrap();
        assert_eq!(found.nome, "Louvor Central");
        assert!(get(&store, "desconhecido").await.is_none());

        let roster = membros(&store, &ministerio.id).await;
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].nome, "Ana");
        assert_eq!(roster[1].nome, "Bea");
    }
}
