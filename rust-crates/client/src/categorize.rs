use crate::game::Game;

/// Per-viewer partition of a game listing. Each view keeps the input order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GameViews<'a> {
    /// Undecided games the viewer plays in.
    pub active: Vec<&'a Game>,
    /// Open games the viewer may take the second seat of.
    pub joinable: Vec<&'a Game>,
    pub ended: Vec<&'a Game>,
}

pub fn categorize<'a>(games: &'a [Game], viewer: Option<&str>) -> GameViews<'a> {
    let mut views = GameViews::default();
    for game in games {
        if is_active_for(game, viewer) {
            views.active.push(game);
        }
        if is_joinable_by(game, viewer) {
            views.joinable.push(game);
        }
        if game.winner.is_some() {
            views.ended.push(game);
        }
    }
    views
}

pub fn is_active_for(game: &Game, viewer: Option<&str>) -> bool {
    match viewer {
        Some(viewer) => game.winner.is_none() && game.has_player(viewer),
        None => false,
    }
}

pub fn is_joinable_by(game: &Game, viewer: Option<&str>) -> bool {
    game.winner.is_none()
        && game.player_two.is_none()
        && viewer.is_none_or(|viewer| game.player_one != viewer)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        game::EMPTY_BOARD,
        test_helpers::{
            address,
            ended_game,
            in_progress_game,
            open_game,
        },
    };
    use proptest::prelude::*;

    fn ids(games: &[&Game]) -> Vec<u64> {
        games.iter().map(|game| game.id).collect()
    }

    #[test]
    fn categorize__open_game_by_viewer() {
        // given
        let a = address(1);
        let b = address(2);
        let games = [open_game(0, a.clone())];

        // when
        let as_creator = categorize(&games, Some(&a));
        let as_other = categorize(&games, Some(&b));
        let anonymous = categorize(&games, None);

        // then
        assert_eq!(ids(&as_creator.active), vec![0]);
        assert!(as_creator.joinable.is_empty());
        assert!(as_other.active.is_empty());
        assert_eq!(ids(&as_other.joinable), vec![0]);
        assert_eq!(ids(&anonymous.joinable), vec![0]);
    }

    #[test]
    fn categorize__ended_game_for_everyone() {
        // given
        let a = address(1);
        let games = [ended_game(4, a.clone(), address(2), a.clone())];

        for viewer in [Some(a.as_str()), Some("ST000000000000000000002AMW42H"), None] {
            // when
            let views = categorize(&games, viewer);

            // then
            assert_eq!(ids(&views.ended), vec![4]);
            assert!(views.active.is_empty());
            assert!(views.joinable.is_empty());
        }
    }

    #[test]
    fn categorize__in_progress_game_only_active_for_players() {
        // given
        let games = [in_progress_game(1, address(1), address(2))];

        // when
        let player_two = categorize(&games, Some(&address(2)));
        let outsider = categorize(&games, Some(&address(3)));

        // then
        assert_eq!(ids(&player_two.active), vec![1]);
        assert_eq!(outsider, GameViews::default());
    }

    #[test]
    fn categorize__preserves_input_order() {
        // given
        let games = [
            open_game(5, address(1)),
            open_game(2, address(2)),
            open_game(9, address(3)),
        ];

        // when
        let views = categorize(&games, None);

        // then
        assert_eq!(ids(&views.joinable), vec![5, 2, 9]);
    }

    fn arb_game() -> impl Strategy<Value = Game> {
        let seat = 1u8..4;
        (
            any::<u64>(),
            seat.clone(),
            proptest::option::of(seat.clone()),
            proptest::option::of(seat),
            any::<bool>(),
        )
            .prop_map(|(id, one, two, winner, turn)| Game {
                id,
                player_one: address(one),
                player_two: two.map(address),
                is_player_one_turn: turn,
                bet_amount: 1,
                board: EMPTY_BOARD,
                // a winner implies a second player
                winner: two.and(winner).map(address),
            })
    }

    proptest! {
        #[test]
        fn categorize__views_respect_exclusivity(
            games in proptest::collection::vec(arb_game(), 0..20),
            viewer in proptest::option::of(1u8..4),
        ) {
            let viewer = viewer.map(address);
            let views = categorize(&games, viewer.as_deref());

            for game in &views.active {
                prop_assert!(game.winner.is_none());
                prop_assert!(!views.ended.iter().any(|ended| std::ptr::eq(*ended, *game)));
                prop_assert!(!views.joinable.iter().any(|open| std::ptr::eq(*open, *game)));
            }
            for game in &views.joinable {
                prop_assert!(game.player_two.is_none());
                prop_assert!(viewer.as_deref() != Some(game.player_one.as_str()));
            }
            let ended = games.iter().filter(|game| game.winner.is_some()).count();
            prop_assert_eq!(views.ended.len(), ended);
            if viewer.is_none() {
                prop_assert!(views.active.is_empty());
            }
        }
    }
}
