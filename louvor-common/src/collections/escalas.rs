//! Service schedules
//!
//! An escala names the service, the date, who plays what, and which
//! songs are planned. Schedules are per ministry and are edited whole:
//! `save` upserts the full entry rather than patching fields.

use crate::models::{from_record, from_records, to_record, Escala};
use crate::store::{conditions, DocumentStore};
use crate::Result;
use chrono::NaiveDate;
use serde_json::json;

/// Storage key for the schedule collection
pub const COLLECTION: &str = "escalas";

/// Create or update a schedule
///
/// An empty `id` lets the store assign one. Returns the schedule as
/// stored, including the assigned id.
pub async fn save(store: &DocumentStore, escala: &Escala) -> Result<Escala> {
    let stored = store.create_record(COLLECTION, to_record(escala)?).await;
    from_record(stored)
}

/// Delete a schedule
pub async fn delete(store: &DocumentStore, escala_id: &str) -> bool {
    store.delete_record(COLLECTION, escala_id).await
}

/// All schedules of a ministry, in insertion order
pub async fn list_by_ministerio(store: &DocumentStore, ministerio_id: &str) -> Vec<Escala> {
    let records = store
        .find_records(
            COLLECTION,
            &conditions(&[("ministerioId", json!(ministerio_id))]),
        )
        .await;
    from_records(records)
}

/// Upcoming schedules of a ministry, soonest first
///
/// Includes schedules on `today` itself.
pub async fn proximas(store: &DocumentStore, ministerio_id: &str, today: NaiveDate) -> Vec<Escala> {
    let mut escalas: Vec<Escala> = list_by_ministerio(store, ministerio_id)
        .await
        .into_iter()
        .filter(|escala| escala.data >= today)
        .collect();
    escalas.sort_by_key(|escala| escala.data);
    escalas
}

/// Schedules of a ministry on an exact date
pub async fn for_date(store: &DocumentStore, ministerio_id: &str, data: NaiveDate) -> Vec<Escala> {
    let records = store
        .find_records(
            COLLECTION,
            &conditions(&[
                ("ministerioId", json!(ministerio_id)),
                ("data", json!(data.format("%Y-%m-%d").to_string())),
            ]),
        )
        .await;
    from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Participante;
    use chrono::Utc;

    fn escala(ministerio_id: &str, data: &str, evento: &str) -> Escala {
        Escala {
            id: String::new(),
            ministerio_id: ministerio_id.to_string(),
            data: data.parse().unwrap(),
            evento: evento.to_string(),
            participantes: Vec::new(),
            musica_ids: Vec::new(),
            observacoes: None,
            criado_em: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_upserts() {
        let store = DocumentStore::in_memory();

        let mut nova = escala("m1", "2026-08-30", "Culto de domingo");
        nova.participantes.push(Participante {
            usuario_id: "u1".to_string(),
            funcao: "vocal".to_string(),
        });

        let salva = save(&store, &nova).await.unwrap();
        assert!(!salva.id.is_empty());
        assert_eq!(salva.participantes.len(), 1);

        // Saving again with the id updates in place
        let mut editada = salva.clone();
        editada.evento = "Culto da noite".to_string();
        save(&store, &editada).await.unwrap();

        let todas = list_by_ministerio(&store, "m1").await;
        assert_eq!(todas.len(), 1);
        assert_eq!(todas[0].evento, "Culto da noite");
    }

    #[tokio::test]
    async fn test_list_by_ministerio_filters() {
        let store = DocumentStore::in_memory();
        save(&store, &escala("m1", "2026-08-30", "Culto")).await.unwrap();
        save(&store, &escala("m2", "2026-08-30", "Culto")).await.unwrap();

        let do_m1 = list_by_ministerio(&store, "m1").await;
        assert_eq!(do_m1.len(), 1);
        assert_eq!(do_m1[0].ministerio_id, "m1");
    }

    #[tokio::test]
    async fn test_proximas_filters_and_sorts() {
        let store = DocumentStore::in_memory();
        let today: NaiveDate = "2026-08-22".parse().unwrap();

        // Inserted out of date order, with one already past
        save(&store, &escala("m1", "2026-09-06", "Culto")).await.unwrap();
        save(&store, &escala("m1", "2026-08-15", "Culto passado")).await.unwrap();
        save(&store, &escala("m1", "2026-08-22", "Culto de hoje")).await.unwrap();
        save(&store, &escala("m1", "2026-08-30", "Culto")).await.unwrap();

        let vindouras = proximas(&store, "m1", today).await;
        assert_eq!(vindouras.len(), 3);
        assert_eq!(vindouras[0].evento, "Culto de hoje");
        assert_eq!(vindouras[1].data, "2026-08-30".parse::<NaiveDate>().unwrap());
        assert_eq!(vindouras[2].data, "2026-09-06".parse::<NaiveDate>().unwrap());
    }

    #[tokio::test]
    async fn test_for_date_matches_exactly() {
        let store = DocumentStore::in_memory();
        save(&store, &escala("m1", "2026-08-30", "Manhã")).await.unwrap();
        save(&store, &escala("m1", "2026-08-30", "Noite")).await.unwrap();
        save(&store, &escala("m1", "2026-09-06", "Culto")).await.unwrap();

        let no_dia = for_date(&store, "m1", "2026-08-30".parse().unwrap()).await;
        assert_eq!(no_dia.len(), 2);
        assert_eq!(no_dia[0].evento, "Manhã");
        assert_eq!(no_dia[1].evento, "Noite");

        let vazio = for_date(&store, "m1", "2026-12-25".parse().unwrap()).await;
        assert!(vazio.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = DocumentStore::in_memory();
        let salva = save(&store, &escala("m1", "2026-08-30", "Culto"))
            .await
            .unwrap();

        assert!(delete(&store, &salva.id).await);
        assert!(!delete(&store, &salva.id).await);
        assert!(list_by_ministerio(&store, "m1").await.is_empty());
    }
}
