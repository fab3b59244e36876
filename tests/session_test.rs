//! End-to-end protocol tests over the scripted mock transport.

use omicron_laser::{CalibrationResult, LaserError, MockTransport, OmicronLaser, OperationMode};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The four identity exchanges every session starts with.
fn identity_replies() -> Vec<Vec<u8>> {
    vec![
        b"!GFwLuxX|4711|v3.12\r".to_vec(),
        b"!GSNSN123456\r".to_vec(),
        b"!GSI488|60\r".to_vec(),
        b"!GMP100\r".to_vec(),
    ]
}

async fn connect_with(extra: Vec<Vec<u8>>) -> OmicronLaser {
    init_logging();
    let mut replies = identity_replies();
    replies.extend(extra);
    OmicronLaser::connect(Box::new(MockTransport::with_replies(replies)))
        .await
        .expect("session construction failed")
}

#[tokio::test]
async fn test_identity_captured_at_connect() {
    let laser = connect_with(vec![]).await;
    let identity = laser.identity();
    assert_eq!(identity.model_code, "LuxX");
    assert_eq!(identity.device_id, "4711");
    assert_eq!(identity.firmware_version, "v3.12");
    assert_eq!(identity.serial_number, "SN123456");
    assert_eq!(identity.wavelength, "488");
    assert_eq!(identity.power, "60");
    assert_eq!(identity.max_power, "100");
}

#[tokio::test]
async fn test_connect_fails_on_malformed_identity() {
    init_logging();
    // Serial number reply too short to parse.
    let replies = vec![b"!GFwLuxX|4711|v3.12\r".to_vec(), b"!GS\r".to_vec()];
    let err = OmicronLaser::connect(Box::new(MockTransport::with_replies(replies)))
        .await
        .err()
        .expect("construction should fail");
    match err {
        LaserError::InitializationFailed { exchange, .. } => assert_eq!(exchange, "GSN"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_measurements_and_working_hours() {
    let mut laser = connect_with(vec![
        b"!GWH1234.5\r".to_vec(),
        b"!MDP19.7\r".to_vec(),
        b"!MTD25.1\r".to_vec(),
        b"!MTA23.9\r".to_vec(),
    ])
    .await;

    assert_eq!(laser.get_working_hours().await.unwrap(), "1234.5");
    assert_eq!(laser.measure_diode_power().await.unwrap(), 19.7);
    assert_eq!(laser.measure_temperature_diode().await.unwrap(), 25.1);
    assert_eq!(laser.measure_temperature_ambient().await.unwrap(), 23.9);
}

#[tokio::test]
async fn test_status_query_decodes_and_caches() {
    let mut laser = connect_with(vec![b"!GAS\x83\x02\r".to_vec()]).await;

    assert!(laser.last_status().is_none());
    let status = laser.get_status().await.unwrap();
    assert!(status.error);
    assert!(status.on);
    assert!(status.key_switch);
    assert!(status.system_power);
    assert!(!status.preheating);
    assert!(!status.external_sensor_connected);
    assert_eq!(laser.last_status(), Some(status));
}

#[tokio::test]
async fn test_latched_failure_query() {
    let mut laser = connect_with(vec![b"!GLF\x41\x02\r".to_vec()]).await;

    let failure = laser.get_latched_failure().await.unwrap();
    assert!(failure.error_state);
    assert!(failure.external_interlock);
    assert!(failure.diode_temperature);
    assert!(!failure.k1_relay_error);
    assert_eq!(laser.last_failure(), Some(failure));
}

#[tokio::test]
async fn test_failure_bytes_are_raw() {
    let mut laser = connect_with(vec![b"!GFB\x10\x00\r".to_vec()]).await;
    assert_eq!(laser.get_failure_bytes().await.unwrap(), vec![0x10, 0x00]);
}

#[tokio::test]
async fn test_level_power_parsed_base_16() {
    let mut laser = connect_with(vec![b"!GLPff3\r".to_vec()]).await;
    assert_eq!(laser.get_level_power().await.unwrap(), 0xff3);
}

#[tokio::test]
async fn test_boolean_command_ack_strictness() {
    let mut laser = connect_with(vec![
        b"!LOn>\r".to_vec(),
        b"!LOfx\r".to_vec(),
        b"!POn\r".to_vec(),
    ])
    .await;

    assert!(laser.laser_on().await.unwrap());
    // Any non-`>` field, including an empty one, is a negative outcome.
    assert!(!laser.laser_off().await.unwrap());
    assert!(!laser.power_on().await.unwrap());
}

#[tokio::test]
async fn test_set_commands_frame_values() {
    init_logging();
    let mock = MockTransport::with_replies(identity_replies());
    mock.push_reply(b"!SAP>\r".to_vec());
    mock.push_reply(b"!SAS>\r".to_vec());
    mock.push_reply(b"!ARs>\r".to_vec());

    let mut laser = OmicronLaser::connect(Box::new(mock.clone())).await.unwrap();
    assert!(laser.set_auto_powerup(true).await.unwrap());
    assert!(laser.set_auto_startup(false).await.unwrap());
    assert!(laser.set_auto_reset(true).await.unwrap());

    let writes = mock.writes();
    assert_eq!(&writes[writes.len() - 3..], &[
        b"?SAP1|\r".to_vec(),
        b"?SAS0|\r".to_vec(),
        b"?ARs1|\r".to_vec(),
    ]);
}

#[tokio::test]
async fn test_adhoc_drain_updates_temporary_power() {
    // Ack, one $TPP push, then a quiet link.
    let mut laser = connect_with(vec![b"!SLP>\r".to_vec(), b"$TPP50.0|\r".to_vec()]).await;

    assert!(laser.set_level_power(0x64).await.unwrap());
    assert_eq!(laser.last_temporary_power(), Some(50.0));
}

#[tokio::test]
async fn test_adhoc_drain_read_count() {
    init_logging();
    let mock = MockTransport::with_replies(identity_replies());
    mock.push_reply(b"!TPP>\r".to_vec());
    mock.push_reply(b"$TPP50.0|\r".to_vec());
    // Queue exhausted afterwards: next read is empty and ends the drain.

    let mut laser = OmicronLaser::connect(Box::new(mock.clone())).await.unwrap();
    let reads_before = mock.reads();
    assert!(laser.set_temporary_power(50.0).await.unwrap());
    assert_eq!(laser.last_temporary_power(), Some(50.0));
    // One read for the ack, then exactly two for the drain.
    assert_eq!(mock.reads() - reads_before, 3);
}

#[tokio::test]
async fn test_adhoc_drain_consumes_unknown_tags() {
    let mut laser = connect_with(vec![
        b"!SLP>\r".to_vec(),
        b"$STA1|\r".to_vec(),
        b"$TPP12.5|\r".to_vec(),
    ])
    .await;

    assert!(laser.set_level_power(1).await.unwrap());
    assert_eq!(laser.last_temporary_power(), Some(12.5));
}

#[tokio::test]
async fn test_operation_mode_round_trip_and_write_back() {
    // GOM with noise in reserved bits, then SOM ack.
    let mut laser = connect_with(vec![b"!GOM\xff\xff\r".to_vec(), b"!SOM>\r".to_vec()]).await;

    let mut mode = laser.get_operation_mode().await.unwrap();
    assert!(mode.usb_adhoc_mode);

    // Toggle one field and write the whole register back.
    mode.usb_adhoc_mode = false;
    assert!(laser.set_operation_mode(mode).await.unwrap());
    assert_eq!(laser.last_mode(), Some(mode));

    // Round trip through the wire layout preserves all 11 fields.
    assert_eq!(OperationMode::from_bytes(mode.to_bytes()), mode);
}

#[tokio::test]
async fn test_reset_happy_path() {
    let mut laser = connect_with(vec![
        b"!RsC\r".to_vec(),
        b"\x00$RsC>\r".to_vec(),
    ])
    .await;

    assert!(laser.reset().await.unwrap());
}

#[tokio::test]
async fn test_reset_with_intermediate_frames() {
    let mut laser = connect_with(vec![
        b"!RsC\r".to_vec(),
        b"$STA1\r".to_vec(),
        b"warming\r".to_vec(),
        b"almost\r".to_vec(),
        b"\x00$RsC>\r".to_vec(),
    ])
    .await;

    assert!(laser.reset().await.unwrap());
}

#[tokio::test]
async fn test_reset_bad_echo_returns_false_without_more_reads() {
    init_logging();
    let mock = MockTransport::with_replies(identity_replies());
    mock.push_reply(b"!GFw\r".to_vec());
    mock.push_reply(b"\x00$RsC>\r".to_vec()); // must never be consumed

    let mut laser = OmicronLaser::connect(Box::new(mock.clone())).await.unwrap();
    assert!(!laser.reset().await.unwrap());
    assert_eq!(mock.remaining(), 1);
}

#[tokio::test]
async fn test_reset_timeout_is_fatal() {
    // Echo arrives, then the link goes quiet: no terminal sequence.
    let mut laser = connect_with(vec![b"!RsC\r".to_vec()]).await;

    match laser.reset().await {
        Err(LaserError::Transport(e)) => {
            assert_eq!(e.kind(), std::io::ErrorKind::TimedOut);
        }
        other => panic!("expected fatal transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_calibration_success() {
    let mut laser = connect_with(vec![
        b"!CLD>\r".to_vec(),
        b"$CLDstarted\r".to_vec(),
        b"working\r".to_vec(),
        b"$CLD0\r".to_vec(),
    ])
    .await;

    assert_eq!(
        laser.calibrate_diode().await.unwrap(),
        CalibrationResult::Success
    );
}

#[tokio::test]
async fn test_calibration_rejected_is_unknown_error() {
    let mut laser = connect_with(vec![b"!CLDx\r".to_vec()]).await;

    assert_eq!(
        laser.calibrate_diode().await.unwrap(),
        CalibrationResult::UnknownError
    );
}

#[tokio::test]
async fn test_calibration_failure_code() {
    let mut laser = connect_with(vec![
        b"!CLD>\r".to_vec(),
        b"started\r".to_vec(),
        b"$CLD3\r".to_vec(),
    ])
    .await;

    assert_eq!(
        laser.calibrate_diode().await.unwrap(),
        CalibrationResult::KeySwitchOff
    );
}

#[tokio::test]
async fn test_calibration_unknown_code_is_error() {
    let mut laser = connect_with(vec![
        b"!CLD>\r".to_vec(),
        b"started\r".to_vec(),
        b"$CLD99\r".to_vec(),
    ])
    .await;

    match laser.calibrate_diode().await {
        Err(LaserError::InvalidCalibrationCode(99)) => {}
        other => panic!("expected InvalidCalibrationCode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_framing_on_the_wire() {
    init_logging();
    let mock = MockTransport::with_replies(identity_replies());
    mock.push_reply(b"!GAS\x00\x00\r".to_vec());
    mock.push_reply(b"!SOM>\r".to_vec());

    let mut laser = OmicronLaser::connect(Box::new(mock.clone())).await.unwrap();
    laser.get_status().await.unwrap();

    let mut mode = OperationMode::default();
    mode.auto_powerup = true;
    mode.usb_adhoc_mode = true;
    laser.set_operation_mode(mode).await.unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            b"?GFw|\r".to_vec(),
            b"?GSN|\r".to_vec(),
            b"?GSI|\r".to_vec(),
            b"?GMP|\r".to_vec(),
            b"?GAS|\r".to_vec(),
            b"?SOMa0|\r".to_vec(),
        ]
    );
}
