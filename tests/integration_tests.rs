//! Integration tests for the commander-ladder service
//!
//! These tests drive the whole ladder through the service facade:
//! - Game recording and rating updates
//! - Win/draw/loss and rank queries
//! - Cascading player deletion
//! - Leaderboard rebuilds and dataset import

mod fixtures;

use commander_ladder::error::LadderError;
use commander_ladder::leaderboard::LeaguePartition;
use commander_ladder::rating::{MockRatingCalculator, SkillInput, SkillModel};
use commander_ladder::service::Dataset;
use commander_ladder::storage::{GameRepository, PlayerRepository};
use commander_ladder::types::League;
use std::sync::Arc;

use fixtures::{create_ladder_with, create_test_ladder, register_players, TestLadder};

/// Players 0-4 and five games covering decisive, draw and free-for-all outcomes
fn seeded_ladder() -> TestLadder {
    let ladder = create_test_ladder();
    register_players(&ladder, 0..5);

    let service = &ladder.service;
    service.record_game(0, Some(0), vec![0, 1]).unwrap();
    service.record_game(1, None, vec![1, 2]).unwrap();
    service.record_game(2, Some(3), vec![0, 1, 2, 3]).unwrap();
    service.record_game(3, Some(2), vec![2, 4]).unwrap();
    service.record_game(4, None, vec![0, 4]).unwrap();

    ladder
}

#[test]
fn test_fresh_players_decisive_game() {
    let ladder = create_test_ladder();
    register_players(&ladder, [1, 2]);

    let initial = ladder.service.load_player(1).unwrap().rating();
    assert!(initial.abs() < 1e-9);

    let processed = ladder.service.record_game(7, Some(1), vec![1, 2]).unwrap();
    assert_eq!(processed.changes.len(), 2);

    let winner = ladder.service.load_player(1).unwrap();
    let loser = ladder.service.load_player(2).unwrap();
    assert!(winner.rating() > loser.rating());
    assert!(winner.rating() > initial);
    assert!(loser.rating() < initial);
    assert!((winner.mu() - 29.396).abs() < 1e-2);
    assert!((loser.mu() - 20.604).abs() < 1e-2);
    assert!((winner.sigma() - 7.171).abs() < 1e-2);
}

#[test]
fn test_draw_between_fresh_players() {
    let ladder = create_test_ladder();
    register_players(&ladder, [1, 2]);

    ladder.service.record_game(1, None, vec![2, 1]).unwrap();

    for id in [1, 2] {
        let player = ladder.service.load_player(id).unwrap();
        assert!((player.mu() - 25.0).abs() < 1e-6);
        assert!((player.sigma() - 6.458).abs() < 1e-2);
    }
}

#[test]
fn test_free_for_all_uses_one_snapshot() {
    let calculator = Arc::new(MockRatingCalculator::new());
    calculator.set_winner_shift(2.0);
    let ladder = create_ladder_with(calculator.clone(), LeaguePartition::default());
    register_players(&ladder, 1..=4);

    ladder
        .service
        .record_game(1, Some(3), vec![4, 3, 2, 1])
        .unwrap();

    let calls = calculator.get_calculation_calls();
    assert_eq!(calls.len(), 1);
    let (skills, rankings) = &calls[0];
    assert_eq!(skills.len(), 4);
    assert!(skills.iter().all(|(_, skill)| *skill == SkillModel::default()));
    for (player_id, rank) in rankings {
        assert_eq!(*rank, if *player_id == 3 { 1 } else { 2 });
    }

    assert_eq!(ladder.service.load_player(3).unwrap().mu(), 27.0);
    for id in [1, 2, 4] {
        assert_eq!(ladder.service.load_player(id).unwrap().mu(), 23.0);
    }
}

#[test]
fn test_win_draw_loss_counts() {
    let ladder = seeded_ladder();
    let expected = [
        (0, (1, 1, 1)),
        (1, (0, 1, 2)),
        (2, (1, 1, 1)),
        (3, (1, 0, 0)),
        (4, (0, 1, 1)),
    ];

    for (id, (wins, draws, losses)) in expected {
        let record = ladder.service.win_draw_loss(id).unwrap();
        assert_eq!((record.wins, record.draws, record.losses), (wins, draws, losses));

        let games = ladder.storage.games_for_player(id).unwrap();
        assert_eq!(record.total() as usize, games.len());
    }

    let draws: Vec<_> = ladder.storage.draws().unwrap().iter().map(|g| g.id()).collect();
    assert_eq!(draws, vec![1, 4]);
}

#[test]
fn test_rank_positions_follow_ratings() {
    let ladder = seeded_ladder();
    let ordered = ladder.storage.players_by_rating().unwrap();
    assert_eq!(ordered.len(), 5);

    for (index, player) in ordered.iter().enumerate() {
        let stats = ladder.service.player_stats(player.id()).unwrap();
        assert_eq!(stats.rank, index + 1);
        assert_eq!(stats.rating, player.rating());
        assert_eq!(stats.games_played, stats.wins + stats.draws + stats.losses);
    }
    for pair in ordered.windows(2) {
        assert!(pair[0].rating() >= pair[1].rating());
    }
}

#[test]
fn test_invalid_games_are_rejected_without_records() {
    let ladder = create_test_ladder();
    register_players(&ladder, [1, 2, 3]);

    let err = ladder
        .service
        .record_game(1, Some(3), vec![1, 2])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LadderError>(),
        Some(LadderError::WinnerNotAParticipant { .. })
    ));

    let err = ladder.service.record_game(2, None, vec![2, 2]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LadderError>(),
        Some(LadderError::NotEnoughPlayers { distinct: 1, .. })
    ));

    let err = ladder.service.record_game(3, None, vec![1, 99]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LadderError>(),
        Some(LadderError::PlayerNotFound { player_id: 99 })
    ));

    assert!(ladder.storage.all_games().unwrap().is_empty());
    for id in [1, 2, 3] {
        assert_eq!(
            ladder.service.load_player(id).unwrap().skill(),
            SkillModel::default()
        );
    }
}

#[test]
fn test_duplicate_game_id_is_rejected() {
    let ladder = create_test_ladder();
    register_players(&ladder, [1, 2]);

    ladder.service.record_game(1, Some(1), vec![1, 2]).unwrap();
    let after_first = ladder.service.load_player(1).unwrap().skill();

    let err = ladder.service.record_game(1, Some(2), vec![1, 2]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LadderError>(),
        Some(LadderError::DuplicateKey { .. })
    ));
    assert_eq!(ladder.service.load_player(1).unwrap().skill(), after_first);
}

#[test]
fn test_delete_player_cascades() {
    let ladder = seeded_ladder();

    ladder.service.delete_player(1).unwrap();

    let err = ladder.service.load_player(1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LadderError>(),
        Some(LadderError::PlayerNotFound { player_id: 1 })
    ));

    // two-player games with player 1 are gone, the free-for-all shrinks
    let remaining: Vec<_> = ladder
        .storage
        .all_games()
        .unwrap()
        .iter()
        .map(|g| g.id())
        .collect();
    assert_eq!(remaining, vec![2, 3, 4]);
    assert_eq!(ladder.storage.load_game(2).unwrap().players(), &[0, 2, 3]);

    let record = ladder.service.win_draw_loss(0).unwrap();
    assert_eq!((record.wins, record.draws, record.losses), (0, 1, 1));

    // the winner of a game takes it along when deleted
    ladder.service.delete_player(3).unwrap();
    assert!(ladder.storage.load_game(2).is_err());
    assert_eq!(ladder.service.win_draw_loss(2).unwrap().total(), 1);
}

#[test]
fn test_override_skill_tolerates_malformed_input() {
    let ladder = create_test_ladder();
    register_players(&ladder, [1]);
    let before = ladder.service.load_player(1).unwrap();

    let malformed = SkillInput::from_json(&serde_json::json!({ "mu": "high" }));
    assert!(!ladder.service.override_skill(1, &malformed).unwrap());
    let after = ladder.service.load_player(1).unwrap();
    assert_eq!(after.skill(), before.skill());
    assert_eq!(after.rating().to_bits(), before.rating().to_bits());

    assert!(ladder
        .service
        .override_skill(1, &SkillInput::new(30.0, 2.0))
        .unwrap());
    let after = ladder.service.load_player(1).unwrap();
    assert_eq!((after.mu(), after.sigma()), (30.0, 2.0));
    assert!((after.rating() - 24.0).abs() < 1e-9);
}

#[test]
fn test_leaderboard_rebuild_partitions_players() {
    let calculator = Arc::new(MockRatingCalculator::new());
    calculator.set_winner_shift(1.0);
    let partition = LeaguePartition::FixedSize {
        uber: 1,
        platinum: 1,
        gold: 1,
        silver: 1,
    };
    let ladder = create_ladder_with(calculator, partition);
    register_players(&ladder, 0..6);

    for id in 0..5 {
        ladder
            .service
            .override_skill(id, &SkillInput::new(30.0 - id as f64, 2.0))
            .unwrap();
    }

    let board = ladder.service.rebuild_leaderboard().unwrap();
    assert_eq!(board.len(), 6);

    let leagues: Vec<_> = board.iter().map(|e| e.league).collect();
    assert_eq!(
        leagues,
        vec![
            League::Uber,
            League::Platinum,
            League::Gold,
            League::Silver,
            League::Bronze,
            League::Bronze
        ]
    );
    let ids: Vec<_> = board.iter().map(|e| e.player_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(board[5].rank, 2);
    assert_eq!(board[5].position, 6);

    assert_eq!(ladder.service.leaderboard().unwrap(), board);
    let rendered = ladder.metrics.render().unwrap();
    assert!(rendered.contains("commander_ladder_leaderboard_rebuilds_total 1"));
}

#[test]
fn test_import_dataset() {
    let ladder = create_test_ladder();
    let dataset = Dataset::from_json(
        r#"{
            "players": [
                {"id": 0, "name": "Atraxa"},
                {"id": 1, "name": "Edgar"},
                {"id": 2, "name": "Kinnan", "mu": 28.0, "sigma": 4.0},
                {"id": 3, "name": "Malformed", "mu": 28.0}
            ],
            "games": [
                {"id": 0, "winner": 0, "players": [0, 1, 2, 3]},
                {"id": 1, "winner": null, "players": [1, 2]},
                {"id": 2, "winner": 5, "players": [1, 2]}
            ],
            "accounts": [
                {"uber_name": "atraxa_fan", "uber_id": "1234", "player_id": 0}
            ],
            "tournaments": [
                {
                    "title": "Friday Night",
                    "date": "2015-01-09T20:00:00Z",
                    "winner": "Atraxa",
                    "mode": "free_for_all",
                    "url": "https://example.org/replays/friday",
                    "path": "replays/friday.zip",
                    "md5_hash": "d41d8cd98f00b204e9800998ecf8427e"
                }
            ]
        }"#,
    )
    .unwrap();

    let summary = ladder.service.import(dataset).unwrap();
    assert_eq!(summary.players_created, 4);
    assert_eq!(summary.games_processed, 2);
    assert_eq!(summary.games_rejected, 1);
    assert_eq!(summary.records_created, 2);

    // a record missing sigma keeps the prior
    assert_eq!(
        ladder.service.load_player(3).unwrap().skill(),
        SkillModel::default()
    );

    let board = ladder.service.rebuild_leaderboard().unwrap();
    let atraxa = board.iter().find(|e| e.player_id == 0).unwrap();
    assert_eq!(atraxa.uber_id.as_deref(), Some("1234"));
}
