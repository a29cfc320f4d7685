// Tile layout unit tests against the public API

use filigrane::watermark::tiling::{rotation_reference, Frame, Point};
use filigrane::watermark::{compute_tile_grid, CoverageMode, TileParams, MAX_TILES};
use rstest::rstest;

fn classic(width: f32, height: f32, text_width: f32, vertical_gap: f32) -> TileParams {
    TileParams {
        surface_width: width,
        surface_height: height,
        text_width,
        text_height: 15.0,
        horizontal_gap: 60.0,
        vertical_gap,
        angle_degrees: -45.0,
        coverage: CoverageMode::Classic,
    }
}

#[rstest]
#[case::secret_on_400(400.0, 200.0, 54.0, 150.0, 24)]
#[case::exact_fit(300.0, 150.0, 100.0, 150.0, 6)]
#[case::wide_text(750.0, 375.0, 300.0, 150.0, 12)]
#[case::text_wider_than_surface(100.0, 100.0, 200.0, 150.0, 2)]
fn test_classic_counts(
    #[case] width: f32,
    #[case] height: f32,
    #[case] text_width: f32,
    #[case] vertical_gap: f32,
    #[case] expected: usize,
) {
    let grid = compute_tile_grid(&classic(width, height, text_width, vertical_gap)).unwrap();
    assert_eq!(grid.len(), expected);
}

#[test]
fn test_columns_step_by_text_width_plus_gap() {
    let grid = compute_tile_grid(&classic(400.0, 200.0, 54.0, 150.0)).unwrap();
    let rows = grid.rows_per_column();

    for (i, column) in grid.tiles().chunks(rows).enumerate() {
        let expected_x = i as f32 * (54.0 + 60.0);
        assert!(column.iter().all(|t| (t.x - expected_x).abs() < 1e-3));
        // Seed row first, then rows from zero
        assert_eq!(column[0].y, 150.0);
        assert_eq!(column[1].y, 0.0);
    }
}

#[test]
fn test_reference_is_left_of_surface() {
    assert_eq!(rotation_reference(400.0, 200.0), Point::new(-200.0, 100.0));
    assert_eq!(rotation_reference(750.0, 375.0), Point::new(-375.0, 187.5));
}

#[test]
fn test_frame_rotation_direction() {
    // At -45 degrees, moving along the baseline goes right and up on screen
    let frame = Frame::new(Point::new(0.0, 0.0), (-45.0f32).to_radians());
    let p = frame.to_surface(10.0, 0.0);
    assert!(p.x > 0.0);
    assert!(p.y < 0.0);
    assert!((p.x + p.y).abs() < 1e-4);
}

#[test]
fn test_limit_error_names_the_bound() {
    let err = compute_tile_grid(&classic(100_000.0, 100_000.0, 0.01, 1.0)).unwrap_err();
    assert!(err.to_string().contains(&MAX_TILES.to_string()));
}

#[test]
fn test_diagonal_and_classic_share_the_frame() {
    let classic_grid = compute_tile_grid(&classic(400.0, 200.0, 54.0, 150.0)).unwrap();
    let diagonal_grid = compute_tile_grid(&TileParams {
        coverage: CoverageMode::Diagonal,
        ..classic(400.0, 200.0, 54.0, 150.0)
    })
    .unwrap();

    assert_eq!(classic_grid.frame(), diagonal_grid.frame());
    for tile in &diagonal_grid {
        let expected = diagonal_grid.frame().to_surface(tile.x, tile.y);
        assert_eq!(tile.origin, expected);
    }
}

#[test]
fn test_coverage_mode_names() {
    let mode: CoverageMode = serde_yaml::from_str("diagonal").unwrap();
    assert_eq!(mode, CoverageMode::Diagonal);
    assert_eq!(CoverageMode::default(), CoverageMode::Classic);
    assert!(serde_yaml::from_str::<CoverageMode>("spiral").is_err());
}
