//! Settings that can change while a session runs.

use tabrefresh_protocol::{GlobalSettings, LiveSettingsPatch, RefreshSettings, TabCommand};

/// Apply the non-scheduling part of `patch` and return the commands the
/// tab's content side needs to catch up.
///
/// Callers reject scheduling fields before getting here.
pub(crate) fn apply_patch(
    settings: &mut RefreshSettings,
    patch: &LiveSettingsPatch,
) -> Vec<TabCommand> {
    let mut commands = Vec::new();

    if let Some(continue_iteration) = patch.continue_iteration {
        settings.continue_iteration = continue_iteration;
    }

    if let Some(enabled) = patch.form_protection
        && enabled != settings.form_protection
    {
        settings.form_protection = enabled;
        commands.push(if enabled {
            TabCommand::EnableFormProtection
        } else {
            TabCommand::DisableFormProtection
        });
    }

    let resources_changed = match patch.monitored_resources {
        Some(ref resources) if *resources != settings.monitored_resources => {
            settings.monitored_resources = resources.clone();
            true
        }
        _ => false,
    };

    match patch.enable_resource_monitoring {
        Some(enabled) if enabled != settings.enable_resource_monitoring => {
            settings.enable_resource_monitoring = enabled;
            commands.push(if enabled {
                TabCommand::StartResourceMonitoring {
                    resources: settings.monitored_resources.clone(),
                }
            } else {
                TabCommand::StopResourceMonitoring
            });
        }
        _ if resources_changed && settings.enable_resource_monitoring => {
            commands.push(TabCommand::StartResourceMonitoring {
                resources: settings.monitored_resources.clone(),
            });
        }
        _ => {}
    }

    commands
}

/// The slice of global preferences that active sessions follow.
pub(crate) fn patch_from_globals(globals: &GlobalSettings) -> LiveSettingsPatch {
    LiveSettingsPatch {
        form_protection: Some(globals.confirm_refresh),
        enable_resource_monitoring: Some(globals.enable_resource_monitoring),
        ..Default::default()
    }
}
