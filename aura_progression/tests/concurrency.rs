// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exactly-once rewards under concurrent callers.

use std::sync::Arc;

use aura_progression::{
    AchievementCategory, AchievementTemplate, AchievementTier, AchievementTrigger, MemoryStore,
    ProgressionConfig, ProgressionEngine, ProgressionError, ProgressionStore, QuestAssignment,
    QuestCadence, QuestCategory, QuestDifficulty, UserId, XpReason,
};
use chrono::{Duration, Utc};

fn engine_on(store: &Arc<MemoryStore>, config: ProgressionConfig) -> Arc<ProgressionEngine> {
    Arc::new(
        ProgressionEngine::new(Arc::clone(store) as Arc<dyn ProgressionStore>, config).unwrap(),
    )
}

fn quiet() -> ProgressionConfig {
    ProgressionConfig::default().with_achievements(Vec::new())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_reward_once() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_on(&store, quiet());
    let user = UserId::new("racer");
    engine.create_progression(&user).await.unwrap();

    let quest = engine
        .assign_quest(
            &user,
            &QuestAssignment {
                cadence: QuestCadence::Weekly,
                category: QuestCategory::Guild,
                difficulty: QuestDifficulty::Medium,
                target: 1,
                ends_at: Some(Utc::now() + Duration::days(7)),
            },
        )
        .await
        .unwrap();
    engine.complete_quest_action(&user, quest.id, 1).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine.claim_quest(&user, quest.id).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(ProgressionError::AlreadyClaimed(_)) => {},
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);

    let snapshot = engine.get_progression_snapshot(&user).await.unwrap();
    // Medium weekly quest: 50 XP and 3 karma, scaled by 3.
    assert_eq!(snapshot.progression.total_xp, 150);
    assert_eq!(snapshot.progression.karma, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn claims_across_engines_sharing_a_store() {
    let store = Arc::new(MemoryStore::new());
    let first = engine_on(&store, quiet());
    let second = engine_on(&store, quiet());
    let user = UserId::new("shared");
    first.create_progression(&user).await.unwrap();

    let quest = first
        .assign_quest(
            &user,
            &QuestAssignment {
                cadence: QuestCadence::Daily,
                category: QuestCategory::Analysis,
                difficulty: QuestDifficulty::Easy,
                target: 1,
                ends_at: Some(Utc::now() + Duration::days(1)),
            },
        )
        .await
        .unwrap();
    first.complete_quest_action(&user, quest.id, 1).await.unwrap();

    let a = {
        let engine = Arc::clone(&first);
        let user = user.clone();
        tokio::spawn(async move { engine.claim_quest(&user, quest.id).await })
    };
    let b = {
        let engine = Arc::clone(&second);
        let user = user.clone();
        tokio::spawn(async move { engine.claim_quest(&user, quest.id).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let events = store.xp_events(&user).await.unwrap();
    let rewards = events
        .iter()
        .filter(|e| e.reason == XpReason::QuestReward)
        .count();
    assert_eq!(rewards, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_keep_ledger_consistent() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_on(&store, quiet());
    let user = UserId::new("busy");
    engine.create_progression(&user).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..50 {
        let engine = Arc::clone(&engine);
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine.grant_xp(&user, 10 + i, XpReason::GuildJoined).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expected: i64 = (0..50).map(|i| 10 + i).sum();
    let report = engine.reconcile(&user).await.unwrap();
    assert!(!report.corrected);
    assert_eq!(report.ledger_total, expected);
    assert_eq!(report.stored_total, expected as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn grants_across_engines_keep_every_xp_event() {
    let store = Arc::new(MemoryStore::new());
    let first = engine_on(&store, quiet());
    let second = engine_on(&store, quiet());
    let user = UserId::new("split");
    first.create_progression(&user).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let engine = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine.grant_xp(&user, 5, XpReason::GuildJoined).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Snapshot writes race across engines; the ledger does not.
    let snapshot = second.get_progression_snapshot(&user).await.unwrap();
    assert_eq!(snapshot.progression.total_xp, 200);
    assert_eq!(store.ledger_total(&user).await.unwrap(), 200);
    assert!(!first.reconcile(&user).await.unwrap().corrected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluations_unlock_once() {
    let store = Arc::new(MemoryStore::new());
    let template = AchievementTemplate::new(
        "centurion",
        "Centurion",
        "Reach 100",
        AchievementTier::Silver,
        AchievementCategory::Mastery,
        AchievementTrigger::Manual,
        100,
    );
    let config = ProgressionConfig::default().with_achievements(vec![template]);
    let first = engine_on(&store, config.clone());
    let second = engine_on(&store, config);
    let user = UserId::new("collector");
    first.create_progression(&user).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine.evaluate_achievement(&user, "centurion", 100).await
        }));
    }

    let mut unlocked = 0;
    for handle in handles {
        unlocked += handle.await.unwrap().unwrap().len();
    }
    assert_eq!(unlocked, 1);

    let rewards = store
        .xp_events(&user)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.reason == XpReason::AchievementReward)
        .count();
    assert_eq!(rewards, 1);
}
