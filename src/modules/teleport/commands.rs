use tracing::{debug, info, warn};

use super::directive::Position;
use super::{Decision, Outcome, TeleportKind};
use crate::commands::{CommandSource, Context, OPERATOR_LEVEL};
use crate::error::MtpError;
use crate::storage::MtpModule;

const BACK_SLOT: &str = "last";

/// The player a command acts for: an explicit `<target>` needs operator level,
/// otherwise it is the calling player.
fn subject(ctx: &Context<'_>, explicit: Option<&str>) -> Result<String, MtpError> {
    match (explicit, &ctx.source) {
        (Some(target), _) => {
            ctx.require_level(OPERATOR_LEVEL)?;
            Ok(target.to_string())
        }
        (None, CommandSource::Player(name)) => Ok(name.clone()),
        (None, CommandSource::Console) => Err(MtpError::MissingArgument("target")),
    }
}

fn create_key(kind: TeleportKind) -> &'static str {
    match kind {
        TeleportKind::Ask => "tpa.create_request",
        TeleportKind::Invite => "tph.create_request",
    }
}

/// `!!tpa <player> [<target>]` and `!!tph <player> [<target>]`
pub async fn request(
    ctx: &Context<'_>,
    kind: TeleportKind,
    player: &str,
    target: Option<&str>,
) -> Result<(), MtpError> {
    let requesting = subject(ctx, target)?;
    ctx.ensure_not_offline(player).await?;
    if target.is_some() {
        ctx.ensure_not_offline(&requesting).await?;
    }

    let handle = ctx.data.tracker.submit(&requesting, player, kind).await?;
    ctx.reply(create_key(kind)).await;

    let request = handle.request().clone();
    tokio::spawn(async move {
        let outcome = handle.wait().await;
        match outcome {
            Outcome::Accepted => info!("Teleport #{} finished", request.id),
            other => debug!("Teleport #{} ended as {:?}", request.id, other),
        }
    });
    Ok(())
}

/// `!!tpr accept|reject|cancel [<target>]`
pub async fn respond(
    ctx: &Context<'_>,
    decision: Decision,
    target: Option<&str>,
) -> Result<(), MtpError> {
    let subject = subject(ctx, target)?;
    let mut origin = None;
    if decision == Decision::Accept && ctx.data.config.enable_modules.back {
        if let Some(pending) = ctx.data.tracker.newest_for(&subject).await {
            let player = pending.moved().to_string();
            let position = ctx.data.info.position(&player).await;
            origin = Some((pending.id, player, position));
        }
    }

    let settled = ctx.data.tracker.confirm(&subject, decision).await?;
    debug!("{} resolved {}", ctx.source, settled);

    // Only the request that was looked up may overwrite the back point.
    if let Some((id, player, position)) = origin {
        if settled.id == id && settled.outcome == Outcome::Accepted {
            remember_origin(ctx, &player, position).await;
        }
    }
    Ok(())
}

/// Stores where `player` stood before being moved. Never fails the command.
async fn remember_origin(ctx: &Context<'_>, player: &str, position: Option<Position>) {
    let Some(origin) = position else {
        debug!("Position of {} unknown, no back point saved", player);
        return;
    };
    if let Err(e) = ctx
        .data
        .storage
        .save_position(MtpModule::Back, player, BACK_SLOT, origin)
        .await
    {
        warn!("Failed to save back point for {}: {}", player, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockInfo};
    use crate::test_data;
    use std::sync::Arc;

    fn online(names: &[&str]) -> MockInfo {
        MockInfo {
            online: Some(names.iter().map(|s| s.to_string()).collect()),
            ..MockInfo::default()
        }
    }

    #[tokio::test]
    async fn player_asks_and_target_accepts() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), online(&["Alice", "Bob"]));

        let alice = Context::new(&data, CommandSource::Player("Alice".into()));
        request(&alice, TeleportKind::Ask, "Bob", None).await.unwrap();
        assert_eq!(host.told_to("Alice"), vec!["tpa.create_request"]);
        assert_eq!(host.told_to("Bob"), vec!["tpa.notify_request"]);

        let bob = Context::new(&data, CommandSource::Player("Bob".into()));
        respond(&bob, Decision::Accept, None).await.unwrap();
        assert_eq!(host.executed(), vec!["tp Alice Bob"]);
    }

    #[tokio::test]
    async fn offline_player_is_refused() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), online(&["Alice"]));

        let alice = Context::new(&data, CommandSource::Player("Alice".into()));
        assert!(matches!(
            request(&alice, TeleportKind::Invite, "Bob", None).await,
            Err(MtpError::PlayerOffline(_))
        ));
        assert_eq!(data.tracker.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_presence_does_not_block() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), MockInfo::default());

        let alice = Context::new(&data, CommandSource::Player("Alice".into()));
        request(&alice, TeleportKind::Ask, "Bob", None).await.unwrap();
        assert_eq!(data.tracker.len().await, 1);
    }

    #[tokio::test]
    async fn acting_for_others_needs_operator() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), online(&["Alice", "Bob", "Carol"]));

        let carol = Context::new(&data, CommandSource::Player("Carol".into()));
        assert!(matches!(
            request(&carol, TeleportKind::Ask, "Bob", Some("Alice")).await,
            Err(MtpError::PermissionDenied)
        ));

        let console = Context::new(&data, CommandSource::Console);
        request(&console, TeleportKind::Ask, "Bob", Some("Alice"))
            .await
            .unwrap();
        let live = data.tracker.live().await;
        assert_eq!(live[0].requesting, "Alice");
        assert_eq!(live[0].target, "Bob");

        assert!(matches!(
            respond(&console, Decision::Accept, None).await,
            Err(MtpError::MissingArgument("target"))
        ));
        respond(&console, Decision::Reject, Some("Bob")).await.unwrap();
        assert_eq!(host.told_to("Alice"), vec!["tpr.rejected"]);
    }

    #[tokio::test]
    async fn accept_saves_origin_when_back_enabled() {
        use crate::modules::teleport::directive::Point3D;

        let dir = tempfile::tempdir().unwrap();
        let origin = Position::new(
            Point3D {
                x: 5.0,
                y: 64.0,
                z: 5.0,
            },
            None,
        );
        let host = Arc::new(MockHost::default());
        let mut data = test_data(
            host.clone(),
            MockInfo {
                position: Some(origin.clone()),
                ..MockInfo::default()
            },
        );
        let mut config = (*data.config).clone();
        config.enable_modules.back = true;
        data.config = Arc::new(config);
        data.storage = Arc::new(crate::storage::DataManager::new(
            dir.path(),
            &data.config.data_storage,
        ));

        let bob = Context::new(&data, CommandSource::Player("Bob".into()));
        request(&bob, TeleportKind::Invite, "Alice", None).await.unwrap();
        let alice = Context::new(&data, CommandSource::Player("Alice".into()));
        respond(&alice, Decision::Accept, None).await.unwrap();

        assert_eq!(host.executed(), vec!["tp Alice Bob"]);
        let saved = data
            .storage
            .saved_positions(MtpModule::Back, "Alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.positions.get(BACK_SLOT), Some(&origin));
    }

    #[tokio::test]
    async fn nothing_to_respond_to() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host, MockInfo::default());

        let bob = Context::new(&data, CommandSource::Player("Bob".into()));
        assert!(matches!(
            respond(&bob, Decision::Accept, None).await,
            Err(MtpError::NotFound(_))
        ));
    }

    #[derive(Debug)]
    struct SlowInfo(Position);

    #[async_trait::async_trait]
    impl crate::host::PlayerInfo for SlowInfo {
        fn name(&self) -> &str {
            "slow"
        }

        async fn online_players(&self) -> Option<Vec<String>> {
            None
        }

        async fn position(&self, _player: &str) -> Option<Position> {
            tokio::time::sleep(std::time::Duration::from_secs(200)).await;
            Some(self.0.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn back_point_untouched_when_request_expires_during_lookup() {
        use crate::modules::info::presence::LogPresence;
        use crate::modules::teleport::directive::Point3D;

        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::MainConfig::default();
        config.enable_modules.back = true;
        let host = Arc::new(MockHost::default());
        let presence = Arc::new(LogPresence::default());
        let slow = SlowInfo(Position::new(
            Point3D {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
            None,
        ));
        let data = crate::Data::new(
            config,
            dir.path().to_path_buf(),
            None,
            host.clone(),
            crate::host::ServerStatus::new(true),
            presence,
            vec![Arc::new(slow)],
        );

        let bob = Context::new(&data, CommandSource::Player("Bob".into()));
        request(&bob, TeleportKind::Ask, "Alice", None).await.unwrap();
        let alice = Context::new(&data, CommandSource::Player("Alice".into()));
        assert!(matches!(
            respond(&alice, Decision::Accept, None).await,
            Err(MtpError::NotFound(_))
        ));

        assert!(host.executed().is_empty());
        assert_eq!(
            data.storage
                .saved_positions(MtpModule::Back, "Bob")
                .await
                .unwrap(),
            None
        );
    }
}
