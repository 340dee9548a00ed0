use crate::grid::Grid;
use sim_types::{Observation, Position, RobotId, WALL_RADIOACTIVITY, WINDOW_SIZE};

/// Builds the 3x3 window centred on `center`. Cells beyond the grid edge read
/// as walls so the window keeps the same orientation everywhere.
pub(crate) fn observe(grid: &Grid, observer: RobotId, center: Position) -> Observation {
    let mut observation = Observation::default();
    for row in 0..WINDOW_SIZE {
        for col in 0..WINDOW_SIZE {
            let (dx, dy) = Observation::cell_offset(row, col);
            let position = center.offset(dx, dy);
            let Some(cell) = grid.cell(position) else {
                continue;
            };
            observation.radioactivity[row][col] = if cell.is_wall {
                WALL_RADIOACTIVITY
            } else {
                cell.radioactivity
            };
            observation.is_wall[row][col] = cell.is_wall;
            observation.waste[row][col] = cell.waste;
            observation.is_deposit[row][col] = cell.deposit.is_some();
            observation.other_robot[row][col] = grid
                .occupant_at(position)
                .is_some_and(|occupant| occupant != observer);
        }
    }
    observation
}
