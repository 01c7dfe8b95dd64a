use crate::contract::model::{AttendanceInterval, Meeting};
use crate::infra::storage::entity::{attendance, meeting};

impl From<attendance::Model> for AttendanceInterval {
    fn from(m: attendance::Model) -> Self {
        Self {
            user_id: m.user_id,
            start_time: m.start_time,
            end_time: m.end_time,
        }
    }
}

/// Assemble a meeting from its row and its attendance rows (any order).
pub fn to_meeting(row: meeting::Model, mut attendance: Vec<attendance::Model>) -> Meeting {
    attendance.sort_by_key(|a| a.id);
    Meeting {
        id: row.id,
        date: row.date,
        code: row.code,
        attendance: attendance.into_iter().map(Into::into).collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    }
}
