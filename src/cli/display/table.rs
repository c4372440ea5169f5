//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::cluster::{ClusterDescription, ClusterStatus, ClusterSummary, TeardownSummary};
use crate::domain::resource::{ExistenceState, Resource, ResourceKind};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    fn table(&self, header: Vec<Cell>) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        table
    }

    /// Render clusters list as a formatted table
    pub fn render_clusters_list(&self, clusters: &[ClusterSummary]) -> String {
        if clusters.is_empty() {
            return "No clusters found".to_string();
        }

        let mut table = self.table(vec![
            Cell::new("CLUSTER").set_alignment(CellAlignment::Left),
            Cell::new("ID").set_alignment(CellAlignment::Left),
            Cell::new("INSTANCES").set_alignment(CellAlignment::Center),
            Cell::new("SERVICES").set_alignment(CellAlignment::Center),
        ]);
        for cluster in clusters {
            let instance_color = if cluster.instances > 0 {
                self.theme.success
            } else {
                self.theme.muted
            };
            table.add_row(vec![
                Cell::new(&cluster.name),
                Cell::new(&cluster.id).fg(self.theme.muted),
                Cell::new(cluster.instances)
                    .fg(instance_color)
                    .set_alignment(CellAlignment::Center),
                Cell::new(cluster.services).set_alignment(CellAlignment::Center),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Clusters {} ─╮\n",
            format!("[{} clusters]", clusters.len()).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render every derived child of a cluster, then its instances and services
    pub fn render_cluster_status(&self, status: &ClusterStatus) -> String {
        let total = status.children.len();
        let present = status
            .children
            .iter()
            .filter(|c| c.state != ExistenceState::Absent)
            .count();
        let overall = StatusIcon::get_status_text(present, total);
        let overall_icon = if status.is_complete() {
            StatusIcon::SUCCESS
        } else if present > 0 {
            StatusIcon::WARNING
        } else {
            StatusIcon::ERROR
        };

        let mut table = self.table(vec![
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("ID").set_alignment(CellAlignment::Left),
            Cell::new("STATE").set_alignment(CellAlignment::Center),
        ]);
        for child in &status.children {
            table.add_row(vec![
                Cell::new(child.kind.label()),
                Cell::new(&child.name),
                Cell::new(child.id.as_deref().unwrap_or("-")).fg(self.theme.muted),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::for_state(child.state),
                    child.state.as_str()
                ))
                .fg(self.theme.get_state_color(child.state))
                .set_alignment(CellAlignment::Center),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "📊 Cluster {} {}\n",
            status.name.bold(),
            format!("{} {} ({}/{})", overall_icon, overall, present, total)
                .color(color_name(self.theme.get_completeness_color(present, total)))
        ));
        output.push_str(&table.to_string());
        output.push('\n');

        if !status.instances.is_empty() {
            output.push_str(&format!(
                "Instances: {}\n",
                status.instances.join(", ")
            ));
        }

        if !status.services.is_empty() {
            let mut services = self.table(vec![
                Cell::new("SERVICE").set_alignment(CellAlignment::Left),
                Cell::new("TASKS").set_alignment(CellAlignment::Center),
            ]);
            for service in &status.services {
                services.add_row(vec![
                    Cell::new(&service.name),
                    Cell::new(format!(
                        "{} {}/{}",
                        StatusIcon::get_count_icon(service.running_count, service.desired_count),
                        service.running_count,
                        service.desired_count
                    ))
                    .fg(self
                        .theme
                        .get_count_color(service.running_count, service.desired_count))
                    .set_alignment(CellAlignment::Center),
                ]);
            }
            output.push_str(&services.to_string());
            output.push('\n');
        }

        output.push_str(&format!(
            "Legend: {} Active  {} Pending  {} Absent\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::PENDING.yellow(),
            StatusIcon::ERROR.red()
        ));
        output
    }

    /// Render resources of a single kind
    pub fn render_resources(&self, kind: ResourceKind, resources: &[Resource]) -> String {
        if resources.is_empty() {
            return format!("No {} resources found", kind.label());
        }

        let mut table = self.table(vec![
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("ID").set_alignment(CellAlignment::Left),
            Cell::new("STATE").set_alignment(CellAlignment::Center),
            Cell::new("CREATED").set_alignment(CellAlignment::Left),
            Cell::new("TAGS").set_alignment(CellAlignment::Left),
        ]);
        for resource in resources {
            let created = resource
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let tags = resource
                .tags
                .iter()
                .map(|t| format!("{}={}", t.key, t.value))
                .collect::<Vec<_>>()
                .join("\n");
            table.add_row(vec![
                Cell::new(&resource.name),
                Cell::new(&resource.id).fg(self.theme.muted),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::for_state(resource.state),
                    resource.state.as_str()
                ))
                .fg(self.theme.get_state_color(resource.state))
                .set_alignment(CellAlignment::Center),
                Cell::new(created),
                Cell::new(tags).fg(self.theme.info),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ {} {} ─╮\n",
            kind.label(),
            format!("[{}]", resources.len()).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Render the children of a freshly created cluster
    pub fn render_description(&self, description: &ClusterDescription) -> String {
        let mut table = self.table(vec![
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("ID").set_alignment(CellAlignment::Left),
        ]);
        for child in &description.resources {
            table.add_row(vec![
                Cell::new(child.kind.label()),
                Cell::new(&child.name).fg(self.theme.success),
                Cell::new(&child.id).fg(self.theme.muted),
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        if let Some(location) = &description.bootstrap {
            output.push_str(&format!("Agent configuration: {}\n", location.path()));
        }
        output
    }

    /// Render what a teardown removed and what was already gone
    pub fn render_teardown(&self, summary: &TeardownSummary) -> String {
        let mut table = self.table(vec![
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("NAME").set_alignment(CellAlignment::Left),
            Cell::new("RESULT").set_alignment(CellAlignment::Center),
        ]);
        for removal in &summary.removals {
            let (text, color) = if removal.deleted {
                (format!("{} deleted", StatusIcon::SUCCESS), self.theme.success)
            } else {
                (format!("{} not found", StatusIcon::UNKNOWN), self.theme.muted)
            };
            table.add_row(vec![
                Cell::new(removal.kind.label()),
                Cell::new(&removal.name),
                Cell::new(text).fg(color).set_alignment(CellAlignment::Center),
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        if !summary.terminated_instances.is_empty() {
            output.push_str(&format!(
                "Terminated instances: {}\n",
                summary.terminated_instances.join(", ")
            ));
        }
        output
    }
}

/// Convert comfy_table::Color to colored::Color string representation
fn color_name(color: comfy_table::Color) -> &'static str {
    use comfy_table::Color;
    match color {
        Color::Green => "green",
        Color::Yellow => "yellow",
        Color::Red => "red",
        Color::Cyan => "cyan",
        Color::DarkGrey => "bright black",
        _ => "white",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::{ChildResource, ChildStatus, Removal};
    use crate::domain::resource::Tag;
    use crate::infrastructure::provider::ServiceSummary;

    #[test]
    fn test_render_empty_clusters() {
        let renderer = TableRenderer::new();
        let output = renderer.render_clusters_list(&[]);
        assert!(output.contains("No clusters found"));
    }

    #[test]
    fn test_render_single_cluster() {
        let renderer = TableRenderer::new();
        let clusters = vec![ClusterSummary {
            name: "demo".to_string(),
            id: "cluster-0001".to_string(),
            instances: 3,
            services: 2,
        }];

        let output = renderer.render_clusters_list(&clusters);
        assert!(output.contains("demo"));
        assert!(output.contains("cluster-0001"));
        assert!(output.contains("[1 clusters]"));
    }

    #[test]
    fn test_render_partial_status() {
        let renderer = TableRenderer::new();
        let status = ClusterStatus {
            name: "demo".to_string(),
            children: vec![
                ChildStatus {
                    kind: ResourceKind::Policy,
                    name: "demo--policy".to_string(),
                    id: Some("policy-0001".to_string()),
                    state: ExistenceState::Active,
                },
                ChildStatus {
                    kind: ResourceKind::Role,
                    name: "demo--role".to_string(),
                    id: None,
                    state: ExistenceState::Absent,
                },
            ],
            instances: vec!["i-0001".to_string()],
            services: vec![ServiceSummary {
                name: "web".to_string(),
                desired_count: 2,
                running_count: 1,
            }],
        };

        let output = renderer.render_cluster_status(&status);
        assert!(output.contains("Partial"));
        assert!(output.contains("demo--role"));
        assert!(output.contains("absent"));
        assert!(output.contains("i-0001"));
        assert!(output.contains("1/2"));
    }

    #[test]
    fn test_render_resources() {
        let renderer = TableRenderer::new();
        assert_eq!(
            renderer.render_resources(ResourceKind::Bucket, &[]),
            "No bucket resources found"
        );

        let resources = vec![Resource {
            kind: ResourceKind::SecurityGroup,
            name: "demo--security-group".to_string(),
            id: "sg-0001".to_string(),
            state: ExistenceState::Active,
            tags: vec![Tag::new("ECS Cluster", "demo")],
            created_at: None,
        }];
        let output = renderer.render_resources(ResourceKind::SecurityGroup, &resources);
        assert!(output.contains("sg-0001"));
        assert!(output.contains("ECS Cluster=demo"));
    }

    #[test]
    fn test_render_description_and_teardown() {
        let renderer = TableRenderer::new();
        let description = ClusterDescription {
            name: "demo".to_string(),
            resources: vec![ChildResource {
                kind: ResourceKind::Cluster,
                name: "demo".to_string(),
                id: "cluster-0001".to_string(),
            }],
            tags: Vec::new(),
            bootstrap: None,
        };
        assert!(renderer.render_description(&description).contains("cluster-0001"));

        let summary = TeardownSummary {
            cluster: "demo".to_string(),
            removals: vec![
                Removal {
                    kind: ResourceKind::Cluster,
                    name: "demo".to_string(),
                    deleted: true,
                },
                Removal {
                    kind: ResourceKind::LaunchConfiguration,
                    name: "demo--launch-config".to_string(),
                    deleted: false,
                },
            ],
            terminated_instances: vec!["i-0001".to_string()],
        };
        let output = renderer.render_teardown(&summary);
        assert!(output.contains("deleted"));
        assert!(output.contains("not found"));
        assert!(output.contains("i-0001"));
    }
}
