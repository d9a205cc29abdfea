use std::sync::Arc;

use boardforge::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
enum Cell { #[default] Empty, X, O }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Board {
    cells: [[Cell; 3]; 3],
}

// ---------------------------------------------------------------------------
// Game definition
// ---------------------------------------------------------------------------

fn tic_tac_toe() -> Result<GameDefinition<Board>, ConfigError> {
    GameBuilder::<Board>::new("tic-tac-toe")
        .players(2, 2)
        .setup(|_| Board { cells: [[Cell::Empty; 3]; 3] })
        .add_move("clickCell", |m, args| {
            let row: usize = parse_arg(args, 0)?;
            let col: usize = parse_arg(args, 1)?;
            if row >= 3 || col >= 3 || m.g.cells[row][col] != Cell::Empty {
                return Err(InvalidMove);
            }
            let mut board = m.g.clone();
            board.cells[row][col] = if m.player_id == PlayerId(0) { Cell::X } else { Cell::O };
            Ok(board)
        })
        .turn(TurnConfig::new().min_moves(1).max_moves(1))
        .end_if(|g, ctx| {
            for mark in [Cell::X, Cell::O] {
                if check_winner(&g.cells, mark) {
                    return Some(json!({ "winner": ctx.current_player }));
                }
            }
            board_full(&g.cells).then(|| json!({ "draw": true }))
        })
        .ai(|g, _, _| {
            free_cells(&g.cells)
                .map(|(row, col)| Candidate::move_("clickCell", vec![json!(row), json!(col)]))
                .collect()
        })
        .build()
}

fn check_winner(b: &[[Cell; 3]; 3], m: Cell) -> bool {
    (0..3).any(|i| (0..3).all(|j| b[i][j] == m))           // rows
    || (0..3).any(|j| (0..3).all(|i| b[i][j] == m))        // cols
    || (0..3).all(|i| b[i][i] == m)                         // diagonal
    || (0..3).all(|i| b[i][2 - i] == m)                     // anti-diagonal
}

fn board_full(b: &[[Cell; 3]; 3]) -> bool {
    b.iter().all(|row| row.iter().all(|c| *c != Cell::Empty))
}

fn free_cells(b: &[[Cell; 3]; 3]) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..9).map(|i| (i / 3, i % 3)).filter(move |&(r, c)| b[r][c] == Cell::Empty)
}

fn render(b: &[[Cell; 3]; 3]) -> String {
    b.iter()
        .map(|row| {
            row.iter()
                .map(|c| match c { Cell::Empty => '.', Cell::X => 'X', Cell::O => 'O' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Local match: one scripted player, one bot, one spectator
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), BoardforgeError> {
    init_tracing("info,boardforge_session=debug");

    let game = Arc::new(tic_tac_toe()?);
    let local = Local::new(
        LocalConfig::new().bot(PlayerId(1), |ctx| Arc::new(RandomBot::new(ctx)) as Arc<dyn Bot<Board>>),
    );

    let (mut spectator, mut spec_rx) = local.transport(TransportOpts::new(Arc::clone(&game)));
    let (mut player, mut player_rx) = local.transport(
        TransportOpts::new(Arc::clone(&game))
            .player(PlayerId(0))
            .credentials("demo-secret"),
    );

    spectator.connect().await?;
    let watcher = tokio::spawn(async move {
        let codec = JsonCodec;
        while let Some(notice) = spec_rx.recv().await {
            let is_chat = matches!(notice, TransportData::Chat { .. });
            match notice.encode_lossy(&codec) {
                Ok(bytes) => println!("[spectator] {}", String::from_utf8_lossy(&bytes)),
                Err(err) => tracing::warn!(error = %err, "could not encode notice"),
            }
            if is_chat {
                break;
            }
        }
    });

    player.connect().await?;
    let mut view = MatchView::new(MatchId::default());
    while let Some(notice) = player_rx.recv().await {
        view.apply(notice);
        let Some(state) = view.state() else { continue };
        if state.ctx.is_over() {
            break;
        }
        if state.ctx.current_player == PlayerId(0) {
            // Centre first, then the first free cell.
            let (row, col) = if state.g.cells[1][1] == Cell::Empty {
                (1, 1)
            } else {
                free_cells(&state.g.cells).next().unwrap_or((0, 0))
            };
            player
                .send_action(Action::make_move("clickCell", vec![json!(row), json!(col)], None))
                .await;
        }
    }

    if let Some(state) = view.state() {
        eprintln!("{}\nresult: {:?}", render(&state.g.cells), state.ctx.gameover);
    }
    player.send_chat_message(json!("gg")).await;
    let _ = watcher.await;

    player.disconnect().await;
    spectator.disconnect().await;
    Ok(())
}
