mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use common::*;
use tipsheet_core::db::{MemoryProcessedStore, ProcessedMessageStore};
use tipsheet_core::error::ResolveError;
use tipsheet_core::extraction::{LookupOutcome, PostContent, ProcessStatus};
use tipsheet_core::ingest::{IngestHandler, IngestOutcome};
use tipsheet_core::models::TeamIdField;
use tipsheet_core::sheet::{Column, MemoryRowStore};

fn post(text: &str) -> PostContent {
    PostContent {
        message_id: 77,
        text: text.to_string(),
        image: None,
        channel_name: "Canal Tips VIP".to_string(),
        posted_at: NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
    }
}

fn la_liga_provider() -> FakeProvider {
    FakeProvider::new()
        .team(541, "Real Madrid")
        .team(529, "Barcelona")
        .fixture(
            date(2026, 10, 18),
            finished_fixture(9001, (541, "Real Madrid"), (529, "Barcelona"), (2, 1)),
        )
}

#[tokio::test]
async fn test_resolves_validated_bet() {
    let provider = Arc::new(la_liga_provider());
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Real x Barça", &new_bet_reply("Real x Barça", "Real Madrid vencer", "hoje 16h00", "Futebol"))
            .on_validation("Real x Barça", &validation_reply("Real Madrid", "Barcelona", "18/10/2026", "16:00")),
    );
    let pipeline = pipeline(provider.clone(), ai);

    let outcome = pipeline.process(&post("Real x Barça, Real Madrid vencer")).await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert_eq!(outcome.lookup, Some(LookupOutcome::Resolved { home_id: 541, away_id: 529 }));
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.match_description.as_deref(), Some("Real Madrid vs Barcelona"));
    assert_eq!(payload.event_datetime.as_deref(), Some("18/10/2026 16:00"));
    assert_eq!(payload.tipster.as_deref(), Some("Canal Tips VIP"));
    assert_eq!(payload.home_team_id, TeamIdField::Id(541));
    assert_eq!(payload.away_team_id, TeamIdField::Id(529));
}

#[tokio::test]
async fn test_unparseable_date_keeps_extracted_value() {
    let provider = Arc::new(FakeProvider::new());
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Time A x Time B", &new_bet_reply("Time A x Time B", "Time A vence", "talvez sexta", "Futebol"))
            .on_validation("Time A x Time B", &validation_reply("Time A", "Time B", "talvez sexta", "")),
    );
    let pipeline = pipeline(provider.clone(), ai);

    let outcome = pipeline.process(&post("Time A x Time B talvez sexta")).await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert!(matches!(outcome.lookup, Some(LookupOutcome::Failed(ResolveError::InvalidDate(_)))));
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.event_datetime.as_deref(), Some("talvez sexta"));
    assert_eq!(payload.home_team_id, TeamIdField::Empty);
    assert_eq!(payload.away_team_id, TeamIdField::Empty);
    assert_eq!(provider.team_searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unconfirmed_match_leaves_ids_empty() {
    let provider = Arc::new(la_liga_provider());
    let ai = Arc::new(
        ScriptedAi::new().on_message("Real x Barça", &new_bet_reply("Real x Barça", "Real vence", "hoje", "Futebol")),
    );
    let pipeline = pipeline(provider, ai);

    let outcome = pipeline.process(&post("Real x Barça")).await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert_eq!(outcome.lookup, Some(LookupOutcome::NotValidated));
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.match_description.as_deref(), Some("Real x Barça"));
    assert_eq!(payload.home_team_id, TeamIdField::Empty);
}

#[tokio::test]
async fn test_failed_lookup_writes_not_found_marker() {
    let provider = Arc::new(FakeProvider::new().team(541, "Real Madrid"));
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Real x Time Fantasma", &new_bet_reply("Real x Time Fantasma", "Real vence", "hoje", ""))
            .on_validation("Time Fantasma", &validation_reply("Real Madrid", "Time Fantasma", "18/10/2026", "16:00")),
    );
    let pipeline = pipeline(provider, ai);

    let outcome = pipeline.process(&post("Real x Time Fantasma")).await;

    assert_eq!(outcome.status, ProcessStatus::Success);
    assert!(matches!(outcome.lookup, Some(LookupOutcome::Failed(ResolveError::TeamNotFound(_)))));
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.home_team_id, TeamIdField::NotFound);
    assert_eq!(payload.away_team_id, TeamIdField::NotFound);
}

#[tokio::test]
async fn test_non_football_skips_lookup() {
    let provider = Arc::new(la_liga_provider());
    let ai = Arc::new(
        ScriptedAi::new().on_message("Lakers", &new_bet_reply("Lakers x Celtics", "Lakers ML", "hoje", "Basquete")),
    );
    let pipeline = pipeline(provider.clone(), ai.clone());

    let outcome = pipeline.process(&post("Lakers x Celtics")).await;

    assert_eq!(outcome.lookup, Some(LookupOutcome::NotFootball));
    assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.team_searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_guards() {
    let provider = Arc::new(la_liga_provider());
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Bom dia", r#"{"message_type": "other"}"#)
            .on_message("sem jogo", r#"{"message_type": "new_bet", "data": {"entry": "Over 2.5"}}"#)
            .on_message("quebrado", "```json {\"message_type\": \"new_bet\", ```"),
    );
    let pipeline = pipeline(provider, ai);

    let ignored = pipeline.process(&post("Bom dia, grupo!")).await;
    assert_eq!(ignored.status, ProcessStatus::Ignored);
    assert_eq!(ignored.reason.as_deref(), Some("other"));

    let missing = pipeline.process(&post("aposta sem jogo")).await;
    assert_eq!(missing.status, ProcessStatus::ProcessingError);
    assert!(missing.payload.is_none());

    let malformed = pipeline.process(&post("json quebrado")).await;
    assert_eq!(malformed.status, ProcessStatus::ProcessingError);

    let unavailable = pipeline.process(&post("nenhuma regra casa")).await;
    assert_eq!(unavailable.status, ProcessStatus::ProcessingError);
}

#[tokio::test]
async fn test_resolve_by_ids_and_by_name_agree() {
    let provider = Arc::new(la_liga_provider());
    let resolver = resolver(provider, Arc::new(ScriptedAi::new()));

    let by_ids = resolver.resolve_by_ids(541, 529, "18/10/2026 16:00").await.unwrap();
    let by_name = resolver
        .resolve_by_name(
            &format!("{} x {}", by_ids.home.name, by_ids.away.name),
            "18/10/2026 16:00",
        )
        .await
        .unwrap();
    assert_eq!(by_ids, by_name);

    let err = resolver.resolve_by_ids(541, 529, "talvez sexta").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidDate(_)));
    let err = resolver.resolve_by_ids(541, 40, "18/10/2026").await.unwrap_err();
    assert_eq!(err.code(), "MatchNotFound");
}

#[tokio::test]
async fn test_ingest_records_once() {
    let provider = Arc::new(la_liga_provider());
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Real x Barça", &new_bet_reply("Real x Barça", "Real Madrid vencer", "hoje", "Futebol"))
            .on_validation("Real x Barça", &validation_reply("Real Madrid", "Barcelona", "18/10/2026", "16:00")),
    );
    let transport = Arc::new(FakeTransport::new(&[(CHAT_ID, "Canal Tips VIP")]));
    let store = Arc::new(MemoryRowStore::new());
    let processed = Arc::new(MemoryProcessedStore::new());
    let handler = IngestHandler::new(pipeline(provider, ai), transport, store.clone(), processed.clone(), "APOSTAS");

    let msg = message(CHAT_ID, 321, "Real x Barça, Real Madrid vencer");
    let bet_id = match handler.handle(&msg).await {
        IngestOutcome::Recorded { bet_id } => bet_id,
        other => panic!("expected a recorded bet, got {:?}", other),
    };
    assert_eq!(handler.handle(&msg).await, IngestOutcome::Duplicate);
    assert!(processed.has(CHAT_ID, 321).await.unwrap());

    let table = store.table("APOSTAS").await.unwrap();
    assert_eq!(table.len(), 2);
    let row = &table[1];
    assert_eq!(cell(row, Column::BetId), bet_id);
    assert_eq!(cell(row, Column::Status), "Pendente");
    assert_eq!(cell(row, Column::Tipster), "Canal Tips VIP");
    assert_eq!(cell(row, Column::SourceLink), "https://t.me/c/1234567890/321");
    assert_eq!(cell(row, Column::EventDateTime), "18/10/2026 16:00");
    assert_eq!(cell(row, Column::HomeTeamId), "541");
    assert_eq!(cell(row, Column::AwayTeamId), "529");
    assert_eq!(cell(row, Column::DayOfMonth), "18");
}

#[tokio::test]
async fn test_ingest_pending_row_for_unusable_date() {
    let ai = Arc::new(
        ScriptedAi::new()
            .on_message("Time A x Time B", &new_bet_reply("Time A x Time B", "Time A vence", "talvez sexta", "Futebol"))
            .on_validation("Time A x Time B", &validation_reply("Time A", "Time B", "talvez sexta", "")),
    );
    let transport = Arc::new(FakeTransport::new(&[(CHAT_ID, "Canal Tips VIP")]));
    let store = Arc::new(MemoryRowStore::new());
    let handler = IngestHandler::new(
        pipeline(Arc::new(FakeProvider::new()), ai),
        transport,
        store.clone(),
        Arc::new(MemoryProcessedStore::new()),
        "APOSTAS",
    );

    let outcome = handler.handle(&message(CHAT_ID, 5, "Time A x Time B talvez sexta")).await;
    assert!(matches!(outcome, IngestOutcome::Recorded { .. }));

    let table = store.table("APOSTAS").await.unwrap();
    let row = &table[1];
    assert_eq!(cell(row, Column::Status), "Pendente");
    assert_eq!(cell(row, Column::EventDateTime), "talvez sexta");
    assert_eq!(cell(row, Column::HomeTeamId), "");
    assert_eq!(cell(row, Column::AwayTeamId), "");
}

#[tokio::test]
async fn test_ignored_message_is_marked_processed() {
    let ai = Arc::new(ScriptedAi::new().on_message("Bom dia", r#"{"message_type": "other"}"#));
    let store = Arc::new(MemoryRowStore::new());
    let processed = Arc::new(MemoryProcessedStore::new());
    let handler = IngestHandler::new(
        pipeline(Arc::new(FakeProvider::new()), ai),
        Arc::new(FakeTransport::new(&[])),
        store.clone(),
        processed.clone(),
        "APOSTAS",
    );

    let outcome = handler.handle(&message(CHAT_ID, 9, "Bom dia")).await;
    assert_eq!(outcome, IngestOutcome::Ignored { label: "other".to_string() });
    assert!(processed.has(CHAT_ID, 9).await.unwrap());
    assert!(store.table("APOSTAS").await.is_none());
}
