use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::status::{Activity, LastBuildStatus, Project};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn projects_table(projects: &[Project]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Project", "Last Build", "Activity", "Last Build Time"]);

    for project in projects {
        table.add_row(vec![
            Cell::new(&project.name),
            status_cell(project.last_build_status),
            activity_cell(project.activity),
            Cell::new(project.formatted_build_time()),
        ]);
    }

    table
}

pub fn status_cell(status: LastBuildStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        LastBuildStatus::Success => cell.fg(TableColor::Green),
        LastBuildStatus::Failure => cell.fg(TableColor::Red),
        LastBuildStatus::Unknown => cell.fg(TableColor::DarkGrey),
    }
}

pub fn activity_cell(activity: Activity) -> Cell {
    let cell = Cell::new(activity.as_str());
    match activity {
        Activity::Building => cell.fg(TableColor::Yellow),
        Activity::Sleeping => cell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_projects_table_lists_every_project() {
        let projects = vec![
            Project {
                name: "demo :: build".to_string(),
                last_build_status: LastBuildStatus::Success,
                activity: Activity::Building,
                last_build_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            Project {
                name: "demo :: deploy".to_string(),
                last_build_status: LastBuildStatus::Failure,
                activity: Activity::Sleeping,
                last_build_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
        ];

        let table = projects_table(&projects);
        let rendered = table.to_string();

        assert_eq!(table.row_iter().count(), 2);
        assert!(rendered.contains("demo :: deploy"));
        assert!(rendered.contains("Failure"));
        assert!(rendered.contains("2024-01-01T00:00:00Z"));
    }
}
