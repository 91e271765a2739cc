//! Wire records shared between the gateway client, pollers, and dashboard
//!
//! Field names are the gateway's, preserved exactly. The client treats every
//! record as a read-only snapshot; there is no derived state or validation.

use serde::{Deserialize, Serialize};

/// One driving session as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "TaxiNumber")]
    pub taxi_number: String,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    /// Absent while the session is still open
    #[serde(rename = "EndTime", default)]
    pub end_time: Option<String>,
    #[serde(rename = "Status")]
    pub status: String,
}

/// One SOS alert as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SosAlert {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "driverid")]
    pub driver_id: String,
    #[serde(rename = "taxiid")]
    pub taxi_id: String,
    pub details: String,
    pub status: String,
    #[serde(rename = "createdtime")]
    pub created_time: String,
    /// Set once an operator has actioned the alert
    #[serde(rename = "actionedtime", default)]
    pub actioned_time: Option<String>,
}

/// One pushed live-feed message: a base64 JPEG frame plus a detection tag
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedFrame {
    pub frame: String,
    pub status: String,
}

/// Driver login form fields
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub pid: String,
    pub taxi: String,
    pub password: String,
}

/// Signup form fields posted to the gateway's user-creation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SignupForm {
    pub firstname: String,
    pub lastname: String,
    pub code: String,
    pub password: String,
}

/// Legacy driver record posted to the gateway's test endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DriverRecord {
    pub name: String,
    pub code: String,
    pub number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_parses_wire_names() {
        let json = r#"{
            "_id": "s1",
            "FirstName": "Ada",
            "LastName": "Jones",
            "TaxiNumber": "T42",
            "StartTime": "2024-01-01T08:00:00Z",
            "EndTime": "2024-01-01T16:00:00Z",
            "Status": "Active"
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "s1");
        assert_eq!(session.first_name, "Ada");
        assert_eq!(session.taxi_number, "T42");
        assert_eq!(session.end_time.as_deref(), Some("2024-01-01T16:00:00Z"));
        assert_eq!(session.status, "Active");
    }

    #[test]
    fn session_tolerates_missing_end_time() {
        let json = r#"{
            "_id": "s2",
            "FirstName": "Ada",
            "LastName": "Jones",
            "TaxiNumber": "T42",
            "StartTime": "2024-01-01T08:00:00Z",
            "Status": "Active"
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.end_time.is_none());
    }

    #[test]
    fn sos_alert_parses_wire_names() {
        let json = r#"{
            "_id": "a1",
            "driverid": "D1",
            "taxiid": "T1",
            "details": "drowsy",
            "status": "open",
            "createdtime": "2024-01-01T00:00:00Z"
        }"#;
        let alert: SosAlert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.id, "a1");
        assert_eq!(alert.driver_id, "D1");
        assert_eq!(alert.status, "open");
        assert!(alert.actioned_time.is_none());
    }

    #[test]
    fn sos_alert_serializes_back_to_wire_names() {
        let alert = SosAlert {
            id: "a1".to_string(),
            driver_id: "D1".to_string(),
            taxi_id: "T1".to_string(),
            details: "drowsy".to_string(),
            status: "open".to_string(),
            created_time: "2024-01-01T00:00:00Z".to_string(),
            actioned_time: None,
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["_id"], "a1");
        assert_eq!(value["driverid"], "D1");
        assert_eq!(value["createdtime"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn feed_frame_parses_push_message() {
        let json = r#"{"frame": "aGVsbG8=", "status": "Drowsy !"}"#;
        let frame: FeedFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.frame, "aGVsbG8=");
        assert_eq!(frame.status, "Drowsy !");
    }
}
