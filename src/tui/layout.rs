use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub upcoming_area: Rect,
    /// Zero height when there are no past reminders
    pub past_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum terminal dimensions required for the application
    /// Width: 30 columns fits a short reminder plus its formatted time
    /// Height: 8 lines (2 outer borders + 4 for the list block + 1 status + 1 buffer)
    pub const MIN_WIDTH: u16 = 30;
    pub const MIN_HEIGHT: u16 = 8;

    pub fn calculate(size: Rect, upcoming_count: usize, past_count: usize) -> Self {
        let min_width_with_border = Self::MIN_WIDTH + 2;
        let min_height_with_border = Self::MIN_HEIGHT + 2;
        let width = size.width.max(min_width_with_border);
        let height = size.height.max(min_height_with_border);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        // Each list block needs 2 border lines plus at least one row
        let list_constraints = if past_count == 0 {
            [Constraint::Min(3), Constraint::Length(0)]
        } else {
            let upcoming_rows = upcoming_count.max(1) as u32 + 2;
            let past_rows = past_count as u32 + 2;
            [
                Constraint::Ratio(upcoming_rows, upcoming_rows + past_rows),
                Constraint::Ratio(past_rows, upcoming_rows + past_rows),
            ]
        };

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                list_constraints[0],
                list_constraints[1],
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        Self {
            inner_area,
            upcoming_area: vertical[0],
            past_area: vertical[1],
            status_area: vertical[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_area_collapses_without_past_reminders() {
        let layout = Layout::calculate(Rect::new(0, 0, 80, 24), 3, 0);
        assert_eq!(layout.past_area.height, 0);
        assert_eq!(layout.status_area.height, 1);
        assert_eq!(layout.upcoming_area.height, 22 - 1);
    }

    #[test]
    fn both_lists_get_room() {
        let layout = Layout::calculate(Rect::new(0, 0, 80, 24), 2, 2);
        assert!(layout.upcoming_area.height >= 3);
        assert!(layout.past_area.height >= 3);
        assert_eq!(layout.status_area.y, 22);
    }
}
