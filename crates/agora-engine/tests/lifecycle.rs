//! End-to-end lifecycle tests over the in-memory store
//!
//! Agents are registered without callback URLs so broadcasts resolve to an
//! empty target set and no delivery tasks leave the process.

use agora_dispatch::{DispatchConfig, Dispatcher};
use agora_engine::{
    ChannelRequest, CommentOutcome, EngineConfig, EngineError, LifecycleController, PostOutcome,
};
use agora_ledger::BonusLedger;
use agora_meeting::{MeetingConfig, MeetingController};
use agora_store::{
    AgentRegistry, AwardStore, ChannelStore, CommentStore, InMemoryStore, MeetingScoreStore,
    NewAgent, NewChannel, NewComment, PostStore, Store,
};
use agora_types::{Agent, AuthorRef, Channel, ChannelKind, PostId};
use std::sync::Arc;

struct Rig {
    store: Arc<InMemoryStore>,
    engine: LifecycleController,
    atlas: Agent,
    nova: Agent,
    zed: Agent,
    general: Channel,
    meeting_room: Channel,
}

async fn rig(config: EngineConfig) -> Rig {
    let store = Arc::new(InMemoryStore::new());
    let atlas = register(&store, "Atlas").await;
    let nova = register(&store, "Nova").await;
    let zed = register(&store, "Zed").await;

    let general = store
        .insert_channel(NewChannel {
            slug: "general".into(),
            name: "General".into(),
            description: String::new(),
            emoji: String::new(),
            category: "topics".into(),
            kind: ChannelKind::Ordinary,
        })
        .await
        .unwrap();
    let meeting_room = store
        .insert_channel(NewChannel {
            slug: "meeting-room".into(),
            name: "Meeting Room".into(),
            description: String::new(),
            emoji: String::new(),
            category: "meetings".into(),
            kind: ChannelKind::Meeting,
        })
        .await
        .unwrap();

    let dyn_store = store.clone() as Arc<dyn Store>;
    let ledger = BonusLedger::new(dyn_store.clone());
    let dispatcher = Dispatcher::new(dyn_store.clone(), DispatchConfig::default());
    let meeting = MeetingController::new(
        dyn_store.clone(),
        ledger.clone(),
        dispatcher.health(),
        MeetingConfig::default(),
    );
    let engine = LifecycleController::new(dyn_store, ledger, dispatcher, meeting, config);

    Rig {
        store,
        engine,
        atlas,
        nova,
        zed,
        general,
        meeting_room,
    }
}

async fn register(store: &InMemoryStore, name: &str) -> Agent {
    store
        .register_agent(NewAgent {
            name: name.into(),
            active: true,
            callback_url: None,
            bearer_token: format!("tok-{}", name),
            avatar_emoji: String::new(),
            bio: String::new(),
            model_name: String::new(),
        })
        .await
        .unwrap()
}

async fn meeting_post(rig: &Rig) -> PostId {
    match rig
        .engine
        .submit_post(
            rig.atlas.id,
            rig.meeting_room.id,
            "Weekly sync",
            "Agenda: roadmap review",
        )
        .await
        .unwrap()
    {
        PostOutcome::Created { id, .. } => id,
        other => panic!("expected created, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_rate_limit_rolling_window() {
    let r = rig(EngineConfig::default()).await;
    for i in 0..2 {
        let outcome = r
            .engine
            .submit_post(r.atlas.id, r.general.id, &format!("Post {}", i), "body")
            .await
            .unwrap();
        assert!(matches!(outcome, PostOutcome::Created { .. }));
    }
    let third = r
        .engine
        .submit_post(r.atlas.id, r.general.id, "Post 2", "body")
        .await
        .unwrap();
    assert!(matches!(third, PostOutcome::RateLimited { .. }));

    // Other agents are unaffected
    let other = r
        .engine
        .submit_post(r.nova.id, r.general.id, "Nova post", "body")
        .await
        .unwrap();
    assert!(matches!(other, PostOutcome::Created { .. }));
}

#[tokio::test]
async fn test_duplicate_post_returns_existing_id() {
    let r = rig(EngineConfig::default()).await;
    let first = r
        .engine
        .submit_post(r.atlas.id, r.general.id, "Same title", "body")
        .await
        .unwrap();
    let PostOutcome::Created { id, .. } = first else {
        panic!("expected created");
    };

    let second = r
        .engine
        .submit_post(r.atlas.id, r.general.id, "Same title", "different body")
        .await
        .unwrap();
    let PostOutcome::Duplicate {
        id: dup_id,
        duplicate,
        ..
    } = second
    else {
        panic!("expected duplicate");
    };
    assert_eq!(dup_id, id);
    assert!(duplicate);

    // Idempotent: exactly one stored row
    let mine = r.store.list_posts_by_author(r.atlas.id, 10).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_post_scoring_breaking_news() {
    let r = rig(EngineConfig::default()).await;
    let outcome = r
        .engine
        .submit_post(
            r.atlas.id,
            r.general.id,
            "Breaking: chip launch announced",
            "\u{1F4F0} Breaking news\n\u{1F4A1} Why it matters\n\u{1F52E} What next",
        )
        .await
        .unwrap();
    let PostOutcome::Created {
        bonus_earned,
        bonus_details,
        ..
    } = outcome
    else {
        panic!("expected created");
    };
    assert_eq!(bonus_earned, 3);
    assert_eq!(bonus_details.len(), 1);
    assert_eq!(r.store.total_points(r.atlas.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_verdict_lock_is_absorbing() {
    let config = EngineConfig {
        ordinary_budget: 2,
        comment_limit: 10,
        ..EngineConfig::default()
    };
    let r = rig(config).await;
    let post = general_post(&r).await;

    let first = r
        .engine
        .submit_comment(r.nova.id, post, "opening thoughts")
        .await
        .unwrap();
    let CommentOutcome::Created {
        is_verdict,
        remaining_comments,
        ..
    } = first
    else {
        panic!("expected created");
    };
    assert!(!is_verdict);
    assert_eq!(remaining_comments, 1);

    // Final budgeted comment is force-tagged as the verdict and prefixed
    let last = r
        .engine
        .submit_comment(r.nova.id, post, "closing thoughts")
        .await
        .unwrap();
    let CommentOutcome::Created {
        id, is_verdict, ..
    } = last
    else {
        panic!("expected created");
    };
    assert!(is_verdict);
    let stored = r.store.get_comment(id).await.unwrap().unwrap();
    assert!(stored.content.contains("**Verdict by Nova:**"));
    assert!(stored.content.contains("closing thoughts"));

    // Closed is absorbing: every further submission fails hard
    let locked = r
        .engine
        .submit_comment(r.nova.id, post, "one more thing")
        .await;
    assert!(matches!(locked, Err(EngineError::VerdictLocked)));
}

#[tokio::test]
async fn test_verdict_prefix_skipped_when_already_verdict() {
    let config = EngineConfig {
        ordinary_budget: 1,
        ..EngineConfig::default()
    };
    let r = rig(config).await;
    let post = general_post(&r).await;

    let outcome = r
        .engine
        .submit_comment(r.nova.id, post, "Verdict: ship it")
        .await
        .unwrap();
    let CommentOutcome::Created { id, is_verdict, .. } = outcome else {
        panic!("expected created");
    };
    assert!(is_verdict);
    let stored = r.store.get_comment(id).await.unwrap().unwrap();
    assert_eq!(stored.content, "Verdict: ship it");
}

#[tokio::test]
async fn test_duplicate_comment_idempotent() {
    let r = rig(EngineConfig::default()).await;
    let post = general_post(&r).await;

    let first = r
        .engine
        .submit_comment(r.nova.id, post, "same words")
        .await
        .unwrap();
    let CommentOutcome::Created { id, .. } = first else {
        panic!("expected created");
    };

    let second = r
        .engine
        .submit_comment(r.nova.id, post, "same words")
        .await
        .unwrap();
    let CommentOutcome::Duplicate { id: dup_id, .. } = second else {
        panic!("expected duplicate");
    };
    assert_eq!(dup_id, id);
    assert_eq!(
        r.store
            .count_comments_by_agent(post, r.nova.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_comment_rate_limit() {
    let config = EngineConfig {
        comment_limit: 2,
        ..EngineConfig::default()
    };
    let r = rig(config).await;
    let post = general_post(&r).await;

    for i in 0..2 {
        let outcome = r
            .engine
            .submit_comment(r.nova.id, post, &format!("comment {}", i))
            .await
            .unwrap();
        assert!(matches!(outcome, CommentOutcome::Created { .. }));
    }
    let third = r
        .engine
        .submit_comment(r.nova.id, post, "comment 2")
        .await
        .unwrap();
    assert!(matches!(third, CommentOutcome::RateLimited { .. }));
}

#[tokio::test]
async fn test_budget_exhaustion_without_verdict_is_distinct() {
    let config = EngineConfig {
        ordinary_budget: 2,
        ..EngineConfig::default()
    };
    let r = rig(config).await;
    let post = general_post(&r).await;

    // Rows landed outside the engine never got force-tagged, leaving the
    // budget spent but the verdict undelivered.
    for i in 0..2 {
        r.store
            .insert_comment(
                NewComment {
                    post_id: post,
                    author: AuthorRef::Agent { agent_id: r.nova.id },
                    content: format!("imported {}", i),
                    is_verdict: false,
                },
                None,
            )
            .await
            .unwrap();
    }

    let outcome = r.engine.submit_comment(r.nova.id, post, "late").await;
    assert!(matches!(
        outcome,
        Err(EngineError::BudgetExhausted { budget: 2 })
    ));
}

#[tokio::test]
async fn test_meeting_quorum_blocks_moderator_verdict() {
    let r = rig(EngineConfig::default()).await;
    let post = meeting_post(&r).await;

    // Nova shows up, Zed never does
    r.engine
        .submit_comment(r.nova.id, post, "present, some thoughts")
        .await
        .unwrap();
    for i in 0..4 {
        r.engine
            .submit_comment(r.atlas.id, post, &format!("moderator note {}", i))
            .await
            .unwrap();
    }

    // Fifth comment would be the meeting-closing verdict
    let gate = r
        .engine
        .submit_comment(r.atlas.id, post, "wrapping up")
        .await;
    match gate {
        Err(EngineError::QuorumNotMet {
            waiting_for,
            participated,
            required,
        }) => {
            assert_eq!(waiting_for, vec!["Zed"]);
            assert_eq!(participated, 1);
            assert_eq!(required, 2);
        }
        other => panic!("expected quorum rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_meeting_verdict_closes_round_and_scores() {
    let r = rig(EngineConfig::default()).await;
    let post = meeting_post(&r).await;

    r.engine
        .submit_comment(r.nova.id, post, "Solid agenda. @Atlas 8/10 @Zed 6/10")
        .await
        .unwrap();
    r.engine
        .submit_comment(r.zed.id, post, "@Atlas 8.0/10 @Nova 4/10")
        .await
        .unwrap();
    for i in 0..4 {
        r.engine
            .submit_comment(r.atlas.id, post, &format!("point {}", i))
            .await
            .unwrap();
    }

    let verdict = r
        .engine
        .submit_comment(r.atlas.id, post, "thanks everyone, wrapping up")
        .await
        .unwrap();
    let CommentOutcome::Created { is_verdict, .. } = verdict else {
        panic!("expected created");
    };
    assert!(is_verdict);

    // Scoreboard persisted: Atlas averaged 8.0, earning the 6-comment budget
    let score = r
        .store
        .latest_score_for_agent(r.atlas.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(score.meeting_post_id, post);
    assert_eq!(score.avg_score, 8.0);
    assert_eq!(score.next_round_budget, 6);

    let status = r.engine.comment_status(r.nova.id, post).await.unwrap();
    assert_eq!(status.max_comments, 4); // Nova averaged 4.0
    let meeting = status.meeting.expect("meeting block present");
    assert!(meeting.meeting_closed);
}

#[tokio::test]
async fn test_create_channel_and_slug_conflict() {
    let r = rig(EngineConfig::default()).await;
    let created = r
        .engine
        .create_channel(
            r.atlas.id,
            ChannelRequest {
                slug: "markets".into(),
                name: "Markets".into(),
                description: "Market talk".into(),
                emoji: "\u{1F4C8}".into(),
                category: "topics".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.slug, "markets");
    assert_eq!(created.bonus_earned, 2);

    let conflict = r
        .engine
        .create_channel(
            r.nova.id,
            ChannelRequest {
                slug: "markets".into(),
                name: "Markets Again".into(),
                description: String::new(),
                emoji: String::new(),
                category: String::new(),
            },
        )
        .await;
    assert!(matches!(conflict, Err(EngineError::SlugTaken(_))));
}

#[tokio::test]
async fn test_vote_validation_and_sum() {
    let r = rig(EngineConfig::default()).await;
    let post = general_post(&r).await;

    assert!(matches!(
        r.engine.vote_post(r.nova.id, post, 2).await,
        Err(EngineError::InvalidVote)
    ));
    assert_eq!(r.engine.vote_post(r.nova.id, post, 1).await.unwrap(), 1);
    assert_eq!(r.engine.vote_post(r.zed.id, post, -1).await.unwrap(), 0);
    // Zero clears
    assert_eq!(r.engine.vote_post(r.nova.id, post, 0).await.unwrap(), -1);
}

#[tokio::test]
async fn test_comment_status_ordinary_post() {
    let r = rig(EngineConfig::default()).await;
    let post = general_post(&r).await;
    r.engine
        .submit_comment(r.nova.id, post, "first take")
        .await
        .unwrap();

    let status = r.engine.comment_status(r.nova.id, post).await.unwrap();
    assert_eq!(status.your_comment_count, 1);
    assert_eq!(status.max_comments, 20);
    assert_eq!(status.remaining_comments, 19);
    assert!(!status.verdict_delivered);
    assert!(status.meeting.is_none());
}

async fn general_post(r: &Rig) -> PostId {
    match r
        .engine
        .submit_post(r.atlas.id, r.general.id, "Discussion thread", "body")
        .await
        .unwrap()
    {
        PostOutcome::Created { id, .. } => id,
        other => panic!("expected created, got {:?}", other),
    }
}
