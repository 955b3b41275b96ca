//! End-to-end extraction: blobs in, ordered candidates out, then reconciled

mod helpers;

use helpers::test_state;
use setlist_common::SourceTag;
use setlist_ingest::db::TracklistStore;
use setlist_ingest::extraction::{CandidateAssembler, CrossSourceMerger, SourceBlob, SourceKind};
use setlist_ingest::services::{ImportCandidate, ImportRequest};
use uuid::Uuid;

const DESCRIPTION: &str = "Recorded live. Tracklist:\n\
    1:00 Silhouettes - Floating Points\n\
    5:30 Baby - Four Tet\n\
    12:30 One More Time - Daft Punk\n\
    20:00 Strings of Life - Derrick May\n\
    28:45 Innerbloom - RÜFÜS DU SOL\n";

fn blobs() -> Vec<SourceBlob> {
    vec![
        SourceBlob::new(SourceKind::Comment, "12:40 Digital Love - Daft Punk").with_weight(200),
        SourceBlob::new(SourceKind::Comment, "ID?").with_weight(80),
        SourceBlob::new(SourceKind::Comment, "🔥🔥🔥"),
        SourceBlob::new(SourceKind::Comment, "anyone know this one?"),
        SourceBlob::new(SourceKind::Comment, "the closer at 50:00 Windowlicker by Aphex Twin").with_weight(3),
        SourceBlob::new(SourceKind::Description, DESCRIPTION),
    ]
}

#[test]
fn test_noise_blobs_yield_nothing() {
    let assembler = CandidateAssembler::new();
    for text in ["ID?", "🔥🔥🔥", "anyone know this one?"] {
        let blob = SourceBlob::new(SourceKind::Comment, text);
        assert!(assembler.assemble(&blob).is_empty(), "{:?} produced candidates", text);
    }
}

#[test]
fn test_full_tracklist_wins_window_conflicts() {
    let merged = CrossSourceMerger::default().merge_blobs(&CandidateAssembler::new(), &blobs());

    let seconds: Vec<u32> = merged.iter().map(|c| c.timestamp_seconds).collect();
    assert_eq!(seconds, vec![60, 330, 750, 1200, 1725, 3000]);

    let at_750 = &merged[2];
    assert_eq!(at_750.title, "One More Time", "description beats the comment 10s later");
    assert_eq!(at_750.artist, "Daft Punk");

    let closer = merged.last().unwrap();
    assert_eq!(closer.title, "Windowlicker");
    assert_eq!(closer.artist, "Aphex Twin");
}

#[test]
fn test_long_form_time_codes_are_not_split() {
    let blob = SourceBlob::new(SourceKind::Comment, "at 1:05:30 Strings of Life by Derrick May");
    let candidates = CandidateAssembler::new().assemble(&blob);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].timestamp_seconds, 3930);
}

#[tokio::test]
async fn test_extract_then_import_is_replay_safe() {
    let (_dir, state) = test_state().await.unwrap();
    let performance_id = Uuid::new_v4();

    let merged = state.settings.merger().merge_blobs(&CandidateAssembler::new(), &blobs());
    let request = ImportRequest {
        performance_id: Some(performance_id),
        candidates: merged.into_iter().map(ImportCandidate::from).collect(),
        source_tag: SourceTag::Description,
        cover_art_url: None,
    };

    let first = state.reconciler.import(&request).await.unwrap();
    assert_eq!(first.inserted_count, 6);
    assert_eq!(first.final_count, 6);

    let second = state.reconciler.import(&request).await.unwrap();
    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.confirmed_count, 6);

    let entries = state.store.entries_for_performance(performance_id).await.unwrap();
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| e.timestamp_seconds > 0));
}
