use std::fmt::Write;
use tictactoe_client::{
    Game,
    GameStatus,
    GameViews,
    game::{
        Board,
        format_stx,
    },
};

pub fn render_board(board: &Board) -> String {
    board
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|cell| cell.symbol().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_card(out: &mut String, game: &Game, footer: &str) {
    let _ = writeln!(out, "#{}  {} STX  {footer}", game.id, format_stx(game.bet_amount));
    for row in render_board(&game.board).lines() {
        let _ = writeln!(out, "    {row}");
    }
}

fn footer(game: &Game) -> String {
    match game.status() {
        GameStatus::Open | GameStatus::InProgress => format!("Next Turn: {}", game.next_mark()),
        GameStatus::Ended => game
            .winning_mark()
            .map(|mark| format!("Winner: {mark}"))
            .unwrap_or_default(),
    }
}

pub fn render_views(views: &GameViews<'_>, connected: bool, total: usize) -> String {
    let mut out = String::new();

    if connected {
        out.push_str("== Active Games ==\n");
        if views.active.is_empty() {
            out.push_str("You haven't joined any games yet\n");
        }
        for game in &views.active {
            render_card(&mut out, game, &footer(game));
        }
        out.push('\n');
    }

    let heading = if connected {
        "Joinable Games"
    } else {
        "All Games"
    };
    let _ = writeln!(out, "== {heading} ==");
    if views.joinable.is_empty() {
        if total == 0 {
            out.push_str("No games found. Be the first to create one!\n");
        } else {
            out.push_str("No joinable games available right now.\n");
        }
    }
    for game in &views.joinable {
        render_card(&mut out, game, &footer(game));
    }

    if !views.ended.is_empty() {
        out.push_str("\n== Ended Games ==\n");
        for game in &views.ended {
            render_card(&mut out, game, &footer(game));
        }
    }
    out
}
