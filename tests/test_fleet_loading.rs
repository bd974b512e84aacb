use std::fs;
use std::path::Path;

use fleet_booking::api::schedule_dto::{AssignmentDto, ScheduleDto};
use fleet_booking::domain::conflict::suggestion_generator::AlternateRanking;
use fleet_booking::domain::utils::id::AssignmentId;
use fleet_booking::error::{ConversionError, Error};
use fleet_booking::loader::parser::{parse_json_file, write_json_file};
use fleet_booking::{Assignment, Decision, EpisodeState, SubmitOutcome, generate_fleet_model};

const FLEET: &str = r#"{
    "vehicles": [
        { "id": "V1", "type": "van", "capacity": 8, "availability": "available" },
        { "id": "V2", "type": "sedan", "capacity": 4, "availability": "maintenance" },
        { "id": "V3", "type": "van", "capacity": 8 }
    ],
    "drivers": [
        { "id": "D1", "skills": ["van", "sedan"] },
        { "id": "D2", "skills": ["van"], "availability": "leave" }
    ]
}"#;

const SCHEDULE: &str = r#"{
    "assignments": [
        {
            "id": "A1",
            "start": "2026-03-02T08:00:00Z",
            "end": "2026-03-02T12:00:00Z",
            "vehicleId": "V1",
            "driverId": "D2",
            "status": "confirmed",
            "passengerCount": 5,
            "location": "Airport"
        }
    ]
}"#;

const POLICY: &str = r#"{ "bufferMinutes": 30, "skipUnavailableAlternates": true, "alternateRanking": "capacityFit" }"#;

const CANDIDATE: &str = r#"{
    "start": "2026-03-02T11:00:00Z",
    "end": "2026-03-02T13:00:00Z",
    "vehicleId": "V1",
    "driverId": "D1",
    "passengerCount": 3
}"#;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_generate_fleet_model() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(dir.path(), "fleet.json", FLEET);
    let schedule = write(dir.path(), "schedule.json", SCHEDULE);
    let policy = write(dir.path(), "policy.json", POLICY);

    let model = generate_fleet_model(&fleet, &schedule, Some(policy.as_str())).unwrap();

    assert_eq!(model.catalog.vehicles().len(), 3);
    assert_eq!(model.catalog.drivers().len(), 2);
    assert_eq!(model.store.len(), 1);
    assert_eq!(model.policy.buffer, chrono::Duration::minutes(30));
    assert!(model.policy.skip_unavailable_alternates);
    assert_eq!(model.policy.alternate_ranking, AlternateRanking::CapacityFit);

    let a1 = model.store.get(&AssignmentId::new("A1")).unwrap();
    assert_eq!(a1.passenger_count, 5);
    assert_eq!(a1.location, "Airport");
}

#[test]
fn test_candidate_from_file_through_the_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(dir.path(), "fleet.json", FLEET);
    let schedule = write(dir.path(), "schedule.json", SCHEDULE);
    let policy = write(dir.path(), "policy.json", POLICY);
    let candidate = write(dir.path(), "candidate.json", CANDIDATE);

    let model = generate_fleet_model(&fleet, &schedule, Some(policy.as_str())).unwrap();
    let workflow = model.workflow();

    let candidate_dto: AssignmentDto = parse_json_file(&candidate).unwrap();
    let candidate = Assignment::try_from(candidate_dto).unwrap();
    assert!(!candidate.id.is_placeholder());

    let SubmitOutcome::Pending(episode) = workflow.submit(candidate).unwrap() else {
        panic!("candidate should conflict with A1");
    };

    // V2 is in maintenance and skipped, V3 seats the group
    let labels: Vec<&str> = episode.suggestions.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Keep vehicle V1 and start at 12:30", "Use vehicle V3 instead of V1"]);

    let outcome = workflow.apply_resolution(&episode, Decision::ApplySuggestion(episode.suggestions[1].id.clone())).unwrap();
    assert_eq!(outcome.state(), EpisodeState::Applied);

    write_json_file(&schedule, &model.store.to_dto()).unwrap();
    let written: ScheduleDto = parse_json_file(&schedule).unwrap();

    assert_eq!(written.assignments.len(), 2);
    assert_eq!(written.assignments[1].vehicle_id, "V3");
    assert_eq!(written.assignments[1].flagged, Some(false));
}

#[test]
fn test_missing_policy_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(dir.path(), "fleet.json", FLEET);
    let schedule = write(dir.path(), "schedule.json", SCHEDULE);

    let model = generate_fleet_model(&fleet, &schedule, None).unwrap();

    assert_eq!(model.policy.buffer, chrono::Duration::minutes(15));
    assert!(!model.policy.skip_unavailable_alternates);
}

#[test]
fn test_duplicate_vehicle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(
        dir.path(),
        "fleet.json",
        r#"{ "vehicles": [{ "id": "V1", "type": "van", "capacity": 8 }, { "id": "V1", "type": "van", "capacity": 8 }], "drivers": [] }"#,
    );
    let schedule = write(dir.path(), "schedule.json", r#"{ "assignments": [] }"#);

    let result = generate_fleet_model(&fleet, &schedule, None);
    assert!(matches!(result, Err(Error::DuplicateResource { .. })));
}

#[test]
fn test_invalid_policy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(dir.path(), "fleet.json", FLEET);
    let schedule = write(dir.path(), "schedule.json", SCHEDULE);
    let policy = write(dir.path(), "policy.json", r#"{ "bufferMinutes": -5 }"#);

    let result = generate_fleet_model(&fleet, &schedule, Some(policy.as_str()));
    assert!(matches!(result, Err(Error::ConversionError(ConversionError::InvalidBuffer(-5)))));
}

#[test]
fn test_unknown_status_in_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = write(dir.path(), "fleet.json", FLEET);
    let schedule = write(
        dir.path(),
        "schedule.json",
        r#"{ "assignments": [{ "id": "A1", "start": "2026-03-02T08:00:00Z", "end": "2026-03-02T09:00:00Z", "vehicleId": "V1", "driverId": "D1", "status": "teleported" }] }"#,
    );

    let result = generate_fleet_model(&fleet, &schedule, None);
    assert!(matches!(result, Err(Error::ConversionError(ConversionError::UnknownStatus(_)))));
}
