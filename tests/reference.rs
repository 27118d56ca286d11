//! Integration tests for the commands which only read reference data.
use fuelcycle::cli::{FlowOpts, ProjectOpts, handle_flow_command, handle_project_command};
use fuelcycle::settings::Settings;

fn project_opts(count: u32) -> ProjectOpts {
    ProjectOpts {
        count,
        fuel: true,
        decommissioning: true,
        country_factor: 1.0,
        reference: None,
    }
}

#[test]
fn test_handle_project_command() {
    unsafe { std::env::set_var("FUELCYCLE_LOG_LEVEL", "off") };

    handle_project_command("smr", &project_opts(2), Some(Settings::default())).unwrap();

    let err = handle_project_command("fusion", &project_opts(1), Some(Settings::default()))
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown reactor type: fusion");

    assert!(handle_project_command("smr", &project_opts(0), Some(Settings::default())).is_err());
}

#[test]
fn test_handle_flow_command() {
    unsafe { std::env::set_var("FUELCYCLE_LOG_LEVEL", "off") };

    let opts = FlowOpts {
        disable_region: vec!["russia".into()],
        disable_material: vec!["hafnium".into()],
        drop_orphans: true,
        ..FlowOpts::default()
    };
    handle_flow_command(&opts, Some(Settings::default())).unwrap();

    let opts = FlowOpts {
        disable_region: vec!["atlantis".into()],
        ..FlowOpts::default()
    };
    assert!(handle_flow_command(&opts, Some(Settings::default())).is_err());
}
