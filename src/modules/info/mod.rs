pub mod presence;

use std::sync::Arc;
use tracing::debug;

use crate::host::PlayerInfo;
use crate::modules::teleport::directive::Position;
use crate::utils::same_identity;

/// Asks each source in order and falls through to the next one only when a
/// source does not know the answer.
#[derive(Debug, Default)]
pub struct GetInfo {
    sources: Vec<Arc<dyn PlayerInfo>>,
}

impl GetInfo {
    pub fn new(sources: Vec<Arc<dyn PlayerInfo>>) -> Self {
        Self { sources }
    }

    pub async fn online_players(&self) -> Option<Vec<String>> {
        for source in &self.sources {
            if let Some(players) = source.online_players().await {
                return Some(players);
            }
            debug!("{} does not know who is online", source.name());
        }
        None
    }

    /// `None` when no source can tell; callers must not treat that as offline.
    pub async fn is_online(&self, player: &str) -> Option<bool> {
        self.online_players()
            .await
            .map(|players| players.iter().any(|p| same_identity(p, player)))
    }

    pub async fn position(&self, player: &str) -> Option<Position> {
        for source in &self.sources {
            if let Some(position) = source.position(player).await {
                return Some(position);
            }
            debug!("{} cannot locate {}", source.name(), player);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockInfo;
    use crate::modules::teleport::directive::Point3D;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn falls_back_on_unknown() {
        let info = GetInfo::new(vec![
            Arc::new(MockInfo::default()),
            Arc::new(MockInfo {
                online: names(&["Alice"]),
                ..MockInfo::default()
            }),
        ]);

        assert_eq!(info.online_players().await, names(&["Alice"]));
        assert_eq!(info.is_online("alice").await, Some(true));
        assert_eq!(info.is_online("Bob").await, Some(false));
    }

    #[tokio::test]
    async fn empty_list_is_an_answer() {
        let info = GetInfo::new(vec![
            Arc::new(MockInfo {
                online: names(&[]),
                ..MockInfo::default()
            }),
            Arc::new(MockInfo {
                online: names(&["Alice"]),
                ..MockInfo::default()
            }),
        ]);

        assert_eq!(info.is_online("Alice").await, Some(false));
    }

    #[tokio::test]
    async fn no_source_means_unknown() {
        let info = GetInfo::default();
        assert_eq!(info.is_online("Alice").await, None);
        assert_eq!(info.position("Alice").await, None);
    }

    #[tokio::test]
    async fn position_from_second_source() {
        let position = Position::new(Point3D { x: 1.0, y: 2.0, z: 3.0 }, None);
        let info = GetInfo::new(vec![
            Arc::new(MockInfo::default()),
            Arc::new(MockInfo {
                position: Some(position.clone()),
                ..MockInfo::default()
            }),
        ]);
        assert_eq!(info.position("Alice").await, Some(position));
    }
}
