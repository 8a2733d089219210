//! Song repertoire and the time-delayed sharing pool
//!
//! Every ministry keeps its own songs. A newly added song carries a
//! future `compartilharEm` date; once that date arrives the sweep
//! promotes the song by flipping `compartilhada`. The shared pool is
//! virtual: promoted songs stay in place and are selected by equality
//! on the flag.

use crate::events::LouvorEvent;
use crate::models::{from_record, from_records, to_record, Musica};
use crate::store::{conditions, DocumentStore, Record};
use crate::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use tracing::{info, warn};

/// Storage key for the song collection
pub const COLLECTION: &str = "musicas";

/// Days a song stays private before becoming eligible for the shared pool
pub const DEFAULT_SHARE_DELAY_DAYS: i64 = 30;

/// Fields of a song being added to a ministry's repertoire
#[derive(Debug, Clone)]
pub struct NovaMusica {
    pub ministerio_id: String,
    pub titulo: String,
    pub artista: Option<String>,
    pub tom: Option<String>,
    pub bpm: Option<u32>,
    pub link_youtube: Option<String>,
    pub link_cifra: Option<String>,
}

/// Promotion date for a song added on `today`
///
/// The delay comes from user-editable config, so an out-of-range value
/// must not abort the add. It degrades to the default delay with a
/// warning instead.
fn share_date(today: NaiveDate, share_delay_days: i64) -> NaiveDate {
    if let Some(date) =
        Duration::try_days(share_delay_days).and_then(|delay| today.checked_add_signed(delay))
    {
        return date;
    }
    warn!(
        "Share delay of {} days is out of range, using {} days",
        share_delay_days, DEFAULT_SHARE_DELAY_DAYS
    );
    today
        .checked_add_signed(Duration::days(DEFAULT_SHARE_DELAY_DAYS))
        .unwrap_or(today)
}

/// Add a song to a ministry's repertoire
///
/// The song starts unshared, with its promotion date stamped
/// `share_delay_days` after `today`. Returns the song as stored,
/// including the assigned id.
pub async fn add(
    store: &DocumentStore,
    nova: NovaMusica,
    today: NaiveDate,
    share_delay_days: i64,
) -> Result<Musica> {
    let musica = Musica {
        id: String::new(),
        ministerio_id: nova.ministerio_id,
        titulo: nova.titulo,
        artista: nova.artista,
        tom: nova.tom,
        bpm: nova.bpm,
        link_youtube: nova.link_youtube,
        link_cifra: nova.link_cifra,
        compartilhada: false,
        compartilhar_em: share_date(today, share_delay_days),
        criado_em: Utc::now(),
    };

    let stored = store.create_record(COLLECTION, to_record(&musica)?).await;
    from_record(stored)
}

/// Update an existing song's metadata
///
/// Returns `false` when the song does not exist.
pub async fn update(store: &DocumentStore, musica: &Musica) -> bool {
    let record = match to_record(musica) {
        Ok(record) => record,
        Err(e) => {
            warn!("Failed to serialize musica '{}': {}", musica.id, e);
            return false;
        }
    };
    store.update_record(COLLECTION, &musica.id, &record).await
}

/// Delete a song
pub async fn delete(store: &DocumentStore, musica_id: &str) -> bool {
    store.delete_record(COLLECTION, musica_id).await
}

/// All songs of a ministry, in insertion order
pub async fn list_by_ministerio(store: &DocumentStore, ministerio_id: &str) -> Vec<Musica> {
    let records = store
        .find_records(
            COLLECTION,
            &conditions(&[("ministerioId", json!(ministerio_id))]),
        )
        .await;
    from_records(records)
}

/// Every song that has been promoted into the shared pool
pub async fn repertorio_compartilhado(store: &DocumentStore) -> Vec<Musica> {
    let records = store
        .find_records(COLLECTION, &conditions(&[("compartilhada", json!(true))]))
        .await;
    from_records(records)
}

/// Promote every unshared song whose promotion date has arrived
///
/// Emits `SongShared` per promoted song on the store's bus and returns
/// how many were promoted. Already shared songs are never touched, so
/// re-running the sweep is harmless.
pub async fn promote_due_songs(store: &DocumentStore, today: NaiveDate) -> usize {
    let records = store
        .find_records(COLLECTION, &conditions(&[("compartilhada", json!(false))]))
        .await;

    let mut promoted = 0;
    for record in records {
        let musica: Musica = match from_record(record) {
            Ok(musica) => musica,
            Err(e) => {
                warn!("Skipping malformed musica record: {}", e);
                continue;
            }
        };
        if musica.compartilhar_em > today {
            continue;
        }

        let mut patch = Record::new();
        patch.insert("compartilhada".to_string(), json!(true));
        if store.update_record(COLLECTION, &musica.id, &patch).await {
            info!("Promoted '{}' into the shared repertoire", musica.titulo);
            store.events().emit_lossy(LouvorEvent::SongShared {
                musica_id: musica.id.clone(),
                ministerio_id: musica.ministerio_id.clone(),
                timestamp: Utc::now(),
            });
            promoted += 1;
        }
    }

    promoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nova(ministerio_id: &str, titulo: &str) -> NovaMusica {
        NovaMusica {
            ministerio_id: ministerio_id.to_string(),
            titulo: titulo.to_string(),
            artista: None,
            tom: Some("G".to_string()),
            bpm: None,
            link_youtube: None,
            link_cifra: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_add_stamps_sharing_fields() {
        let store = DocumentStore::in_memory();

        let musica = add(&store, nova("m1", "Oceanos"), day("2026-08-22"), 30)
            .await
            .unwrap();

        assert!(!musica.id.is_empty());
        assert!(!musica.compartilhada);
        assert_eq!(musica.compartilhar_em, day("2026-09-21"));
    }

    #[tokio::test]
    async fn test_absurd_share_delay_falls_back_to_default() {
        let store = DocumentStore::in_memory();
        let today = day("2026-08-22");
        let fallback = day("2026-09-21");

        // Too many days for a Duration at all
        let enorme = add(&store, nova("m1", "Enorme"), today, i64::MAX)
            .await
            .unwrap();
        assert_eq!(enorme.compartilhar_em, fallback);

        let negativa = add(&store, nova("m1", "Negativa"), today, i64::MIN)
            .await
            .unwrap();
        assert_eq!(negativa.compartilhar_em, fallback);

        // Representable as a Duration but past the calendar's end
        let distante = add(&store, nova("m1", "Distante"), today, 200_000_000)
            .await
            .unwrap();
        assert_eq!(distante.compartilhar_em, fallback);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = DocumentStore::in_memory();
        let mut musica = add(&store, nova("m1", "Oceanos"), day("2026-08-22"), 30)
            .await
            .unwrap();

        musica.tom = Some("A".to_string());
        musica.bpm = Some(72);
        assert!(update(&store, &musica).await);

        let atual = &list_by_ministerio(&store, "m1").await[0];
        assert_eq!(atual.tom.as_deref(), Some("A"));
        assert_eq!(atual.bpm, Some(72));

        // A song that was never stored cannot be updated
        let mut fantasma = musica.clone();
        fantasma.id = "desconhecida".to_string();
        assert!(!update(&store, &fantasma).await);

        assert!(delete(&store, &musica.id).await);
        assert!(!delete(&store, &musica.id).await);
    }

    #[tokio::test]
    async fn test_list_by_ministerio_filters() {
        let store = DocumentStore::in_memory();
        add(&store, nova("m1", "Oceanos"), day("2026-08-22"), 30)
            .await
            .unwrap();
        add(&store, nova("m2", "Santo"), day("2026-08-22"), 30)
            .await
            .unwrap();

        let do_m1 = list_by_ministerio(&store, "m1").await;
        assert_eq!(do_m1.len(), 1);
        assert_eq!(do_m1[0].titulo, "Oceanos");
    }

    #[tokio::test]
    async fn test_promote_due_songs() {
        let store = DocumentStore::in_memory();
        let today = day("2026-08-22");

        // Due yesterday, due today, and not due for another month
        add(&store, nova("m1", "Vencida"), today, -1).await.unwrap();
        add(&store, nova("m1", "No dia"), today, 0).await.unwrap();
        add(&store, nova("m2", "Futura"), today, 30).await.unwrap();

        let mut rx = store.events().subscribe();

        assert_eq!(promote_due_songs(&store, today).await, 2);

        let pool = repertorio_compartilhado(&store).await;
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|musica| musica.compartilhada));
        assert!(pool.iter().any(|musica| musica.titulo == "Vencida"));
        assert!(pool.iter().any(|musica| musica.titulo == "No dia"));

        // The future-dated song is untouched
        let do_m2 = list_by_ministerio(&store, "m2").await;
        assert!(!do_m2[0].compartilhada);

        // One SongShared event per promotion
        let mut shared = 0;
        while let Ok(event) = rx.try_recv() {
            if let LouvorEvent::SongShared { ministerio_id, .. } = event {
                assert_eq!(ministerio_id, "m1");
                shared += 1;
            }
        }
        assert_eq!(shared, 2);
    }

    #[tokio::test]
    async fn test_promote_due_songs_is_idempotent() {
        let store = DocumentStore::in_memory();
        let today = day("2026-08-22");
        add(&store, nova("m1", "Vencida"), today, -5).await.unwrap();

        assert_eq!(promote_due_songs(&store, today).await, 1);
        assert_eq!(promote_due_songs(&store, today).await, 0);
        assert_eq!(repertorio_compartilhado(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_pool_spans_ministries() {
        let store = DocumentStore::in_memory();
        let today = day("2026-08-22");
        add(&store, nova("m1", "Oceanos"), today, 0).await.unwrap();
        add(&store, nova("m2", "Santo"), today, 0).await.unwrap();

        promote_due_songs(&store, today).await;

        let pool = repertorio_compartilhado(&store).await;
        assert_eq!(pool.len(), 2);
        let ministries: Vec<&str> = pool
            .iter()
            .map(|musica| musica.ministerio_id.as_str())
            .collect();
        assert!(ministries.contains(&"m1"));
        assert!(ministries.contains(&"m2"));
    }

    #[tokio::test]
    async fn test_promotion_preserves_other_fields() {
        let store = DocumentStore::in_memory();
        let today = day("2026-08-22");
        let mut musica = nova("m1", "Oceanos");
        musica.artista = Some("Hillsong".to_string());
        add(&store, musica, today, 0).await.unwrap();

        promote_due_songs(&store, today).await;

        let atual = &list_by_ministerio(&store, "m1").await[0];
        assert!(atual.compartilhada);
        assert_eq!(atual.titulo, "Oceanos");
        assert_eq!(atual.artista.as_deref(), Some("Hillsong"));
        assert_eq!(atual.tom.as_deref(), Some("G"));
    }
}
