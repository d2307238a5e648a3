use pretty_assertions::assert_eq;
use scene_core::{PromptItem, PromptRegistry, PromptStatus, RegistryError};

#[test]
fn append_assigns_increasing_ids_and_skips_blank_texts() {
    let mut registry = PromptRegistry::new();
    let first = registry.append(["a sunrise", "  ", "a forest "], 100);
    let second = registry.append(vec!["a river".to_string()], 200);

    let ids: Vec<_> = first.iter().chain(&second).map(PromptItem::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(first[1].text(), "a forest");
    assert!(first.iter().all(|item| item.status() == PromptStatus::Pending));
    assert_eq!(second[0].created_at(), 200);
    assert_eq!(registry.len(), 3);
}

#[test]
fn ids_are_not_reused_after_clear() {
    let mut registry = PromptRegistry::new();
    registry.append(["a", "b"], 0);
    registry.clear();
    assert!(registry.is_empty());

    let added = registry.append(["c"], 0);
    assert_eq!(added[0].id(), 3);
}

#[test]
fn status_moves_forward_only() {
    let mut registry = PromptRegistry::new();
    registry.append(["a"], 0);

    assert_eq!(
        registry.set_status(1, PromptStatus::Completed, None, 5),
        Err(RegistryError::InvalidTransition {
            id: 1,
            from: PromptStatus::Pending,
            to: PromptStatus::Completed,
        })
    );
    registry
        .set_status(1, PromptStatus::Submitted, None, 5)
        .unwrap();
    assert_eq!(registry.find(1).unwrap().submitted_at(), Some(5));
    registry
        .set_status(1, PromptStatus::Failed, Some("timeout".into()), 6)
        .unwrap();
    assert_eq!(registry.find(1).unwrap().error(), Some("timeout"));

    let err = registry
        .set_status(1, PromptStatus::Completed, None, 7)
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    assert_eq!(
        registry.set_status(9, PromptStatus::Submitted, None, 7),
        Err(RegistryError::UnknownPrompt(9))
    );
}

#[test]
fn stats_follow_item_statuses() {
    let mut registry = PromptRegistry::new();
    registry.append(["a", "b", "c", "d"], 0);
    registry.set_status(1, PromptStatus::Submitted, None, 1).unwrap();
    registry.set_status(1, PromptStatus::Completed, None, 2).unwrap();
    registry.set_status(2, PromptStatus::Submitted, None, 3).unwrap();

    let stats = registry.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.failed, 0);
    assert!(!registry.all_terminal());

    registry.reset_statuses();
    assert_eq!(registry.stats().pending, 4);
    assert_eq!(registry.find(1).unwrap().submitted_at(), None);
}

#[test]
fn from_items_validates_and_keeps_high_water_mark() {
    let items = vec![
        PromptItem::restore(2, "a", PromptStatus::Completed, None, 0, Some(1)),
        PromptItem::restore(5, "b", PromptStatus::Pending, None, 0, None),
    ];
    let registry = PromptRegistry::from_items(items, 3).unwrap();
    assert_eq!(registry.next_id(), 6);

    let registry = PromptRegistry::from_items(Vec::new(), 9).unwrap();
    assert_eq!(registry.next_id(), 9);

    let out_of_order = vec![
        PromptItem::restore(4, "a", PromptStatus::Pending, None, 0, None),
        PromptItem::restore(4, "b", PromptStatus::Pending, None, 0, None),
    ];
    assert_eq!(
        PromptRegistry::from_items(out_of_order, 1),
        Err(RegistryError::NonIncreasingIds { previous: 4, id: 4 })
    );

    let blank = vec![PromptItem::restore(1, "   ", PromptStatus::Pending, None, 0, None)];
    assert_eq!(
        PromptRegistry::from_items(blank, 1),
        Err(RegistryError::EmptyText(1))
    );
}

#[test]
fn restore_drops_error_for_non_failed_items() {
    let item = PromptItem::restore(1, "a", PromptStatus::Completed, Some("stale".into()), 0, None);
    assert_eq!(item.error(), None);
}

#[test]
fn reconcile_keeps_recorded_progress_and_refuses_retired_ids() {
    let mut registry = PromptRegistry::new();
    registry.append(["a", "b", "c"], 0);
    registry
        .set_status(1, PromptStatus::Submitted, None, 50)
        .unwrap();
    registry
        .set_status(1, PromptStatus::Failed, Some("blocked".into()), 60)
        .unwrap();

    let incoming = vec![
        PromptItem::restore(1, "a edited", PromptStatus::Pending, None, 0, None),
        PromptItem::restore(3, "c", PromptStatus::Pending, None, 0, None),
        PromptItem::restore(4, "d", PromptStatus::Submitted, None, 0, None),
    ];
    let next = registry.reconcile(incoming, 900).unwrap();

    let first = next.find(1).unwrap();
    assert_eq!(first.text(), "a edited");
    assert_eq!(first.status(), PromptStatus::Failed);
    assert_eq!(first.error(), Some("blocked"));
    assert_eq!(first.submitted_at(), Some(50));
    assert_eq!(next.find(2), None);
    assert_eq!(next.find(4).unwrap().submitted_at(), Some(900));
    assert_eq!(next.next_id(), 5);

    // Id 2 was dropped from the list; it cannot come back.
    let retired = vec![PromptItem::restore(2, "b", PromptStatus::Pending, None, 0, None)];
    assert_eq!(
        next.reconcile(retired, 1_000),
        Err(RegistryError::RetiredId(2))
    );
}
