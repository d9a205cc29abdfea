//! Integration tests for sessions: sync filtering, redaction, sharing and
//! the bot driver, using small mock games.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use boardforge_ai::{Bot, BotContext, BotError, BotFuture, RandomBot};
use boardforge_core::{
    ActivePlayers, Candidate, DEFAULT_STAGE, GameBuilder, GameDefinition, InvalidMove, MoveConfig,
    TurnConfig, parse_arg,
};
use boardforge_protocol::{Action, GameState, MatchId, PlayerId, REDACTED_ARG, SyncInfo, TransportData};
use boardforge_session::{ConnectionId, LocalConfig, SessionHandle, SessionRegistry};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedReceiver};

// =========================================================================
// Mock games
// =========================================================================

/// Each player has a private hand; `play` hides its argument from others.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Hands {
    hands: Vec<Vec<u32>>,
    played: Vec<u32>,
}

fn hands_game() -> Arc<GameDefinition<Hands>> {
    Arc::new(
        GameBuilder::<Hands>::new("hands")
            .setup(|ctx| Hands {
                hands: (0..ctx.num_players as u32).map(|p| vec![p, p + 10]).collect(),
                played: vec![],
            })
            .add_move_with("play", MoveConfig { redact: true }, |m, args| {
                let card: u32 = parse_arg(args, 0)?;
                let mut g = m.g.clone();
                let hand = &mut g.hands[m.player_id.0 as usize];
                let pos = hand.iter().position(|&c| c == card).ok_or(InvalidMove)?;
                hand.remove(pos);
                g.played.push(card);
                Ok(g)
            })
            .player_view(|g, _, viewer| Hands {
                hands: g
                    .hands
                    .iter()
                    .enumerate()
                    .map(|(seat, hand)| {
                        if viewer == Some(PlayerId(seat as u32)) {
                            hand.clone()
                        } else {
                            vec![]
                        }
                    })
                    .collect(),
                played: g.played.clone(),
            })
            .build()
            .unwrap(),
    )
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Board {
    cells: Vec<Option<PlayerId>>,
}

fn tic_tac_toe() -> Arc<GameDefinition<Board>> {
    const LINES: [[usize; 3]; 8] = [
        [0, 1, 2],
        [3, 4, 5],
        [6, 7, 8],
        [0, 3, 6],
        [1, 4, 7],
        [2, 5, 8],
        [0, 4, 8],
        [2, 4, 6],
    ];
    Arc::new(
        GameBuilder::<Board>::new("tic-tac-toe")
            .players(2, 2)
            .setup(|_| Board {
                cells: vec![None; 9],
            })
            .add_move("clickCell", |m, args| {
                let idx: usize = parse_arg(args, 0)?;
                if m.g.cells.get(idx).copied().flatten().is_some() || idx >= 9 {
                    return Err(InvalidMove);
                }
                let mut board = m.g.clone();
                board.cells[idx] = Some(m.player_id);
                Ok(board)
            })
            .turn(TurnConfig::new().max_moves(1))
            .end_if(|g, _| {
                let winner = LINES.iter().find_map(|[a, b, c]| {
                    let first = g.cells[*a]?;
                    (g.cells[*b] == Some(first) && g.cells[*c] == Some(first)).then_some(first)
                });
                match winner {
                    Some(w) => Some(json!({ "winner": w })),
                    None if g.cells.iter().all(Option::is_some) => Some(json!({ "draw": true })),
                    None => None,
                }
            })
            .ai(|g, _, _| {
                g.cells
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.is_none())
                    .map(|(i, _)| Candidate::move_("clickCell", vec![json!(i)]))
                    .collect()
            })
            .seed(42)
            .build()
            .unwrap(),
    )
}

/// A counter whose bot seats always end their turn after one increment.
fn counter_game() -> Arc<GameDefinition<u32>> {
    Arc::new(
        GameBuilder::<u32>::new("counter")
            .add_move("inc", |m, _| Ok(*m.g + 1))
            .turn(TurnConfig::new().max_moves(1))
            .ai(|_, _, _| vec![Candidate::move_("inc", vec![])])
            .build()
            .unwrap(),
    )
}

/// Everyone may claim at any time. A claim names the slot it expects to
/// fill, so a claim computed from an outdated state is rejected.
fn slots_game() -> Arc<GameDefinition<Vec<PlayerId>>> {
    Arc::new(
        GameBuilder::<Vec<PlayerId>>::new("slots")
            .players(2, 2)
            .add_move("claim", |m, args| {
                let slot: usize = parse_arg(args, 0)?;
                if slot != m.g.len() {
                    return Err(InvalidMove);
                }
                let mut g = m.g.clone();
                g.push(m.player_id);
                Ok(g)
            })
            .turn(TurnConfig::new().active_players(ActivePlayers::all(DEFAULT_STAGE)))
            .end_if(|g, _| (g.len() >= 3).then(|| json!({ "full": true })))
            .ai(|g, _, _| vec![Candidate::move_("claim", vec![json!(g.len())])])
            .build()
            .unwrap(),
    )
}

fn claim(slot: usize) -> Action {
    Action::make_move("claim", vec![json!(slot)], None)
}

type Answer = fn(&GameState<Vec<PlayerId>>, usize) -> Result<Option<Action>, BotError>;

/// Blocks every `play` call until a permit is released, and records how
/// many calls were made and how many overlapped.
#[derive(Clone)]
struct GatedBot {
    permits: Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    answer: Answer,
}

impl GatedBot {
    fn new(answer: Answer) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            answer,
        }
    }

    fn local(&self) -> LocalConfig<Vec<PlayerId>> {
        let bot = self.clone();
        LocalConfig::new().bot(PlayerId(1), move |_: BotContext<Vec<PlayerId>>| {
            Arc::new(bot.clone()) as Arc<dyn Bot<Vec<PlayerId>>>
        })
    }

    fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bot was never asked to play");
    }
}

impl Bot<Vec<PlayerId>> for GatedBot {
    fn play(&self, state: GameState<Vec<PlayerId>>, _player_id: PlayerId) -> BotFuture<'_> {
        async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|err| BotError::Failed(err.to_string()))?;
            permit.forget();
            self.running.fetch_sub(1, Ordering::SeqCst);
            (self.answer)(&state, call)
        }
        .boxed()
    }
}

fn claim_seen(state: &GameState<Vec<PlayerId>>, _call: usize) -> Result<Option<Action>, BotError> {
    Ok(Some(claim(state.g.len())))
}

fn pass_first(state: &GameState<Vec<PlayerId>>, call: usize) -> Result<Option<Action>, BotError> {
    if call == 0 {
        Ok(None)
    } else {
        claim_seen(state, call)
    }
}

fn fail_first(state: &GameState<Vec<PlayerId>>, call: usize) -> Result<Option<Action>, BotError> {
    if call == 0 {
        Err(BotError::Failed("flaky".into()))
    } else {
        claim_seen(state, call)
    }
}

fn always_pass(_: &GameState<Vec<PlayerId>>, _call: usize) -> Result<Option<Action>, BotError> {
    Ok(None)
}

struct PanickingBot;

impl<G> Bot<G> for PanickingBot {
    fn play(&self, _state: GameState<G>, _player_id: PlayerId) -> BotFuture<'_> {
        panic!("bot exploded")
    }
}

struct FailingBot;

impl<G> Bot<G> for FailingBot {
    fn play(&self, _state: GameState<G>, _player_id: PlayerId) -> BotFuture<'_> {
        let result: Result<Option<Action>, BotError> = Err(BotError::Failed("no idea".into()));
        futures_util::future::ready(result).boxed()
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn random_bot<G: boardforge_core::GameData>(ctx: BotContext<G>) -> Arc<dyn Bot<G>> {
    Arc::new(RandomBot::new(ctx))
}

async fn attach<G: boardforge_core::GameData>(
    handle: &SessionHandle<G>,
    player: Option<u32>,
) -> (ConnectionId, UnboundedReceiver<TransportData<G>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = ConnectionId::next();
    handle.attach(conn, player.map(PlayerId), tx).await.unwrap();
    (conn, rx)
}

fn sync_info<G: std::fmt::Debug>(notice: TransportData<G>) -> SyncInfo<G> {
    match notice {
        TransportData::Sync { info, .. } => info,
        other => panic!("expected sync, got {other:?}"),
    }
}

/// Receives syncs until one satisfies `done`, failing after a timeout.
async fn sync_until<G: std::fmt::Debug>(
    rx: &mut UnboundedReceiver<TransportData<G>>,
    mut done: impl FnMut(&SyncInfo<G>) -> bool,
) -> SyncInfo<G> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let notice = rx.recv().await.expect("session dropped the connection");
            if let TransportData::Sync { info, .. } = notice {
                if done(&info) {
                    return info;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for sync")
}

/// Waits until the session has no bot in flight.
async fn bot_idle<G: boardforge_core::GameData>(handle: &SessionHandle<G>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.info().await.unwrap().bot_running {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bot never finished");
}

// =========================================================================
// Player view and redaction
// =========================================================================

#[tokio::test]
async fn test_sync_player_views_differ_per_recipient() {
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&hands_game(), None, None, &LocalConfig::default())
        .await
        .unwrap();

    let (_, mut rx0) = attach(&handle, Some(0)).await;
    let (_, mut rx1) = attach(&handle, Some(1)).await;
    let (_, mut spec) = attach(&handle, None).await;

    let p0 = sync_info(rx0.recv().await.unwrap());
    let p1 = sync_info(rx1.recv().await.unwrap());
    let spectator = sync_info(spec.recv().await.unwrap());

    assert_eq!(p0.state.g.hands, vec![vec![0, 10], vec![]]);
    assert_eq!(p1.state.g.hands, vec![vec![], vec![1, 11]]);
    assert_ne!(p0.state.g, p1.state.g);

    let expected = hands_game().player_view(
        &handle.state().await.unwrap().g,
        &spectator.state.ctx,
        None,
    );
    assert_eq!(spectator.state.g, expected);
}

#[tokio::test]
async fn test_sync_redaction_stable_across_syncs() {
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&hands_game(), None, None, &LocalConfig::default())
        .await
        .unwrap();
    let (c0, mut rx0) = attach(&handle, Some(0)).await;
    let (c1, mut rx1) = attach(&handle, Some(1)).await;
    rx0.recv().await.unwrap();
    rx1.recv().await.unwrap();

    assert!(handle
        .dispatch(c0, Action::make_move("play", vec![json!(10)], None))
        .await
        .unwrap());

    let mine = sync_info(rx0.recv().await.unwrap());
    assert_eq!(mine.log[0].action.payload().args, vec![json!(10)]);

    for _ in 0..3 {
        handle.request_sync(c1).await.unwrap();
    }
    // The broadcast sync plus three requested ones.
    for _ in 0..4 {
        let theirs = sync_info(rx1.recv().await.unwrap());
        assert_eq!(theirs.log.len(), 1);
        assert_eq!(theirs.log[0].action.payload().args, vec![Value::from(REDACTED_ARG)]);
        assert_eq!(theirs.log[0].action.name(), "play");
        assert!(theirs.log[0].redact);
    }

    let full = handle.state().await.unwrap();
    assert_eq!(full.deltalog[0].action.payload().args, vec![json!(10)]);
}

// =========================================================================
// Sharing and legality
// =========================================================================

#[tokio::test]
async fn test_spectator_and_player_share_session() {
    let registry = SessionRegistry::default();
    let game = hands_game();
    let local = LocalConfig::default();

    let spectator_handle = registry
        .get_or_create(&game, Some(MatchId::from("m")), Some(2), &local)
        .await
        .unwrap();
    let (c0, _rx) = attach(&spectator_handle, Some(0)).await;
    spectator_handle
        .dispatch(c0, Action::make_move("play", vec![json!(0)], None))
        .await
        .unwrap();

    let player_handle = registry
        .get_or_create(&game, Some(MatchId::from("m")), Some(2), &local)
        .await
        .unwrap();
    let (_, mut spec_rx) = attach(&spectator_handle, None).await;
    let (_, mut player_rx) = attach(&player_handle, Some(1)).await;

    assert!(spectator_handle.same_session(&player_handle));
    let spectator = sync_info(spec_rx.recv().await.unwrap());
    let player = sync_info(player_rx.recv().await.unwrap());
    assert_eq!(spectator.state.state_id, 1);
    assert_eq!(player.state.state_id, spectator.state.state_id);
    assert_eq!(player.log.len(), spectator.log.len());
}

#[tokio::test]
async fn test_rejected_dispatch_still_syncs_sender() {
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&hands_game(), None, None, &LocalConfig::default())
        .await
        .unwrap();
    let (c0, mut rx0) = attach(&handle, Some(0)).await;
    rx0.recv().await.unwrap();

    // Player 0 doesn't hold card 1.
    let accepted = handle
        .dispatch(c0, Action::make_move("play", vec![json!(1)], None))
        .await
        .unwrap();

    assert!(!accepted);
    let info = sync_info(rx0.recv().await.unwrap());
    assert_eq!(info.state.state_id, 0);
    assert!(info.log.is_empty());
}

#[tokio::test]
async fn test_active_players_outsider_move_is_noop() {
    let game = Arc::new(
        GameBuilder::<u32>::new("respond")
            .add_move("inc", |m, _| Ok(*m.g + 1))
            .turn(TurnConfig::new().active_players(ActivePlayers::players([PlayerId(1)])))
            .build()
            .unwrap(),
    );
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&game, None, None, &LocalConfig::default())
        .await
        .unwrap();
    let (c0, _rx0) = attach(&handle, Some(0)).await;
    let before = handle.state().await.unwrap();

    let accepted = handle
        .dispatch(c0, Action::make_move("inc", vec![], None))
        .await
        .unwrap();

    assert!(!accepted);
    assert_eq!(handle.state().await.unwrap(), before);
}

// =========================================================================
// Bot driver
// =========================================================================

#[tokio::test]
async fn test_all_bot_match_chains_to_gameover() {
    let registry = SessionRegistry::default();
    let local = LocalConfig::new()
        .bot(PlayerId(0), random_bot)
        .bot(PlayerId(1), random_bot);
    let handle = registry
        .get_or_create(&tic_tac_toe(), None, None, &local)
        .await
        .unwrap();

    let (_, mut rx) = attach(&handle, None).await;
    let last = sync_until(&mut rx, |info| info.state.ctx.is_over()).await;

    assert!(last.state.state_id >= 5);
    assert_eq!(last.log.len() as u64, last.state.state_id);
    let ids: Vec<u64> = last.log.iter().map(|e| e.state_id).collect();
    assert_eq!(ids, (0..last.state.state_id).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_bot_moves_after_human_then_stops_at_human_turn() {
    let registry = SessionRegistry::default();
    let local = LocalConfig::new().bot(PlayerId(1), random_bot);
    let handle = registry
        .get_or_create(&counter_game(), None, None, &local)
        .await
        .unwrap();
    let (c0, mut rx) = attach(&handle, Some(0)).await;
    rx.recv().await.unwrap();

    handle
        .dispatch(c0, Action::make_move("inc", vec![], None))
        .await
        .unwrap();
    let after_bot = sync_until(&mut rx, |info| info.state.state_id == 2).await;
    bot_idle(&handle).await;

    assert_eq!(after_bot.state.g, 2);
    assert_eq!(after_bot.state.ctx.current_player, PlayerId(0));
    assert_eq!(after_bot.log[1].action.player_id(), Some(PlayerId(1)));
    assert_eq!(handle.state().await.unwrap().state_id, 2);
}

#[tokio::test]
async fn test_panicking_bot_releases_flag() {
    let registry = SessionRegistry::default();
    let local = LocalConfig::new().bot(PlayerId(0), |_: BotContext<u32>| {
        Arc::new(PanickingBot) as Arc<dyn Bot<u32>>
    });
    let handle = registry
        .get_or_create(&counter_game(), None, None, &local)
        .await
        .unwrap();

    let (_, _rx) = attach(&handle, None).await;
    bot_idle(&handle).await;

    let info = handle.info().await.unwrap();
    assert_eq!(info.state_id, 0);
    assert!(!info.bot_running);
}

#[tokio::test]
async fn test_failing_bot_does_not_take_session_down() {
    let registry = SessionRegistry::default();
    let local = LocalConfig::new().bot(PlayerId(1), |_: BotContext<u32>| {
        Arc::new(FailingBot) as Arc<dyn Bot<u32>>
    });
    let handle = registry
        .get_or_create(&counter_game(), None, None, &local)
        .await
        .unwrap();
    let (c0, _rx) = attach(&handle, Some(0)).await;

    handle
        .dispatch(c0, Action::make_move("inc", vec![], None))
        .await
        .unwrap();
    bot_idle(&handle).await;

    let info = handle.info().await.unwrap();
    assert_eq!(info.state_id, 1);
    assert_eq!(info.connections, 1);
}

#[tokio::test]
async fn test_bots_ignored_without_enumerator() {
    let game = Arc::new(
        GameBuilder::<u32>::new("plain")
            .add_move("inc", |m, _| Ok(*m.g + 1))
            .build()
            .unwrap(),
    );
    let registry = SessionRegistry::default();
    let local = LocalConfig::new().bot(PlayerId(0), random_bot);
    let handle = registry.get_or_create(&game, None, None, &local).await.unwrap();

    let (_, _rx) = attach(&handle, None).await;

    assert!(!handle.info().await.unwrap().bot_running);
}

// =========================================================================
// Bot races and single-flight
// =========================================================================

/// Lets the bot start on state 0, lands a human claim first, then releases
/// the bot and waits for the match to fill up.
async fn race_human_against(bot: &GatedBot) -> SyncInfo<Vec<PlayerId>> {
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&slots_game(), None, None, &bot.local())
        .await
        .unwrap();
    let (c0, mut rx) = attach(&handle, Some(0)).await;
    bot.wait_for_calls(1).await;

    assert!(handle.dispatch(c0, claim(0)).await.unwrap());
    assert!(handle.info().await.unwrap().bot_running);
    bot.release(10);

    let last = sync_until(&mut rx, |info| info.state.ctx.is_over()).await;
    bot_idle(&handle).await;
    last
}

#[tokio::test]
async fn test_human_move_lands_while_bot_thinks() {
    let bot = GatedBot::new(claim_seen);

    let last = race_human_against(&bot).await;

    // The bot's first claim targeted slot 0 and lost; it then took the rest.
    assert_eq!(last.state.g, vec![PlayerId(0), PlayerId(1), PlayerId(1)]);
    assert_eq!(last.log[0].action.player_id(), Some(PlayerId(0)));
    assert_eq!(bot.calls(), 3);
    assert_eq!(bot.peak(), 1);
}

#[tokio::test]
async fn test_bot_pass_after_human_move_resumes_chain() {
    let bot = GatedBot::new(pass_first);

    let last = race_human_against(&bot).await;

    assert_eq!(last.state.g, vec![PlayerId(0), PlayerId(1), PlayerId(1)]);
    assert_eq!(bot.calls(), 3);
    assert_eq!(bot.peak(), 1);
}

#[tokio::test]
async fn test_bot_failure_after_human_move_resumes_chain() {
    let bot = GatedBot::new(fail_first);

    let last = race_human_against(&bot).await;

    assert_eq!(last.state.g, vec![PlayerId(0), PlayerId(1), PlayerId(1)]);
    assert_eq!(bot.calls(), 3);
}

#[tokio::test]
async fn test_bot_pass_without_progress_stops_chain() {
    let bot = GatedBot::new(always_pass);
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&slots_game(), None, None, &bot.local())
        .await
        .unwrap();

    let (_, _rx) = attach(&handle, Some(0)).await;
    bot.release(10);
    bot_idle(&handle).await;

    assert_eq!(bot.calls(), 1);
    assert_eq!(handle.info().await.unwrap().state_id, 0);
}

#[tokio::test]
async fn test_repeated_triggers_run_one_bot_at_a_time() {
    let bot = GatedBot::new(claim_seen);
    let registry = SessionRegistry::default();
    let handle = registry
        .get_or_create(&slots_game(), None, None, &bot.local())
        .await
        .unwrap();
    let (c0, mut rx) = attach(&handle, Some(0)).await;
    bot.wait_for_calls(1).await;

    for _ in 0..5 {
        let (_, _spectator) = attach(&handle, None).await;
        handle.request_sync(c0).await.unwrap();
        assert!(!handle.dispatch(c0, claim(7)).await.unwrap());
        handle.update_player(c0, Some(PlayerId(0))).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let info = handle.info().await.unwrap();
    assert!(info.bot_running);
    assert_eq!(info.state_id, 0);
    assert_eq!(bot.calls(), 1);

    bot.release(10);
    let last = sync_until(&mut rx, |info| info.state.ctx.is_over()).await;
    bot_idle(&handle).await;

    assert_eq!(last.state.g, vec![PlayerId(1); 3]);
    assert_eq!(bot.calls(), 3);
    assert_eq!(bot.peak(), 1);
}
