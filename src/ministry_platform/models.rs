//! Wire models for the Ministry Platform events endpoint.

use serde::Deserialize;

/// One event record as returned by the upstream stored procedure. Field
/// names mirror the wire payload; everything except the reconciliation key
/// (`Event_Room_ID`) and the room id may be absent.
///
/// Timestamps stay raw strings here; parsing happens in the sync engine so
/// a malformed value is reported against the record that carried it.
#[derive(Clone, Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "Event_Room_ID")]
    pub event_room_id: i64,
    #[serde(rename = "Room_ID")]
    pub room_id: i64,
    #[serde(rename = "Event_Title")]
    pub event_title: Option<String>,
    #[serde(rename = "Event_Type_ID")]
    pub event_type_id: Option<i64>,
    #[serde(rename = "Event_Start_Date")]
    pub event_start_date: Option<String>,
    #[serde(rename = "Event_End_Date")]
    pub event_end_date: Option<String>,
    #[serde(rename = "Event_Reservation_Start")]
    pub event_reservation_start: Option<String>,
    #[serde(rename = "Event_Reservation_End")]
    pub event_reservation_end: Option<String>,
    #[serde(rename = "Minutes_for_Setup")]
    pub minutes_for_setup: Option<i64>,
    #[serde(rename = "Minutes_for_Cleanup")]
    pub minutes_for_cleanup: Option<i64>,
    #[serde(rename = "Cancelled")]
    pub cancelled: Option<bool>,
    #[serde(rename = "_Approved")]
    pub approved: Option<bool>,
}
