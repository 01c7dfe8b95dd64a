use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    AttendanceCommand, AttendanceInterval, CalendarDate, Meeting, MeetingKey, MeetingPatch,
};
use crate::domain::codes::{is_url_safe, CodeGenerator};
use crate::domain::dates::DateNormalizer;
use crate::domain::error::DomainError;
use crate::domain::ports::UserDirectory;
use crate::domain::repo::{
    AppendOutcome, CloseOutcome, InsertOutcome, MeetingFields, MeetingsRepository, NewMeeting,
    UpdateOutcome, Visibility,
};

/// Meeting lifecycle and attendance tracking.
///
/// Holds no mutable state of its own; every cross-request guarantee is
/// delegated to the repository's conditional operations.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn MeetingsRepository>,
    users: Arc<dyn UserDirectory>,
    codes: Arc<dyn CodeGenerator>,
    dates: DateNormalizer,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Generate-and-check rounds before giving up on a unique code.
    pub max_code_attempts: u32,
    pub min_code_len: usize,
    pub max_code_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: 10,
            min_code_len: 4,
            max_code_len: 32,
        }
    }
}

impl Service {
    pub fn new(
        repo: Arc<dyn MeetingsRepository>,
        users: Arc<dyn UserDirectory>,
        codes: Arc<dyn CodeGenerator>,
        dates: DateNormalizer,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            users,
            codes,
            dates,
            config,
        }
    }

    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    #[instrument(name = "meetings.service.create_meeting", skip(self), fields(date = %date))]
    pub async fn create_meeting(&self, date: CalendarDate) -> Result<Meeting, DomainError> {
        info!("Creating meeting");
        let day = self.dates.normalize(&date);

        if let Some(existing) = self.find_by_date(day).await? {
            debug!(meeting_id = %existing.id, "Date already has a meeting");
            return Err(self.duplicate(existing));
        }

        let attempts = self.config.max_code_attempts;
        for attempt in 1..=attempts {
            let Some(code) = self.candidate_code(None).await? else {
                debug!(attempt, "Code candidate collided");
                continue;
            };

            let outcome = self
                .repo
                .insert(NewMeeting {
                    id: Uuid::new_v4(),
                    date: day,
                    code,
                    created_at: Utc::now(),
                })
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

            match outcome {
                InsertOutcome::Inserted(meeting) => {
                    info!(meeting_id = %meeting.id, code = %meeting.code, "Meeting created");
                    return Ok(meeting);
                }
                InsertOutcome::CodeTaken => {
                    debug!(attempt, "Code taken concurrently");
                }
                InsertOutcome::DateTaken => {
                    // Lost a race with another creator for the same day.
                    return Err(match self.find_by_date(day).await? {
                        Some(existing) => self.duplicate(existing),
                        None => self.date_taken(day),
                    });
                }
            }
        }

        warn!(attempts, "Meeting code generation exhausted");
        Err(DomainError::CodeGenerationExhausted { attempts })
    }

    #[instrument(name = "meetings.service.get_by_date", skip(self), fields(date = %date))]
    pub async fn get_by_date(&self, date: CalendarDate) -> Result<Meeting, DomainError> {
        let day = self.dates.normalize(&date);
        self.find_by_date(day)
            .await?
            .ok_or_else(|| DomainError::meeting_not_found(format!("date {date}")))
    }

    #[instrument(name = "meetings.service.get_by_id", skip(self), fields(meeting_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Meeting, DomainError> {
        self.load(id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| DomainError::meeting_not_found(id))
    }

    #[instrument(name = "meetings.service.get_by_code", skip(self))]
    pub async fn get_by_code(&self, code: &str) -> Result<Meeting, DomainError> {
        self.repo
            .find_by_code(code, None)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::meeting_not_found(format!("code {code}")))
    }

    pub async fn get(&self, key: &MeetingKey) -> Result<Meeting, DomainError> {
        match key {
            MeetingKey::Id(id) => self.get_by_id(*id).await,
            MeetingKey::Date(date) => self.get_by_date(*date).await,
            MeetingKey::Code(code) => self.get_by_code(code).await,
        }
    }

    #[instrument(name = "meetings.service.list_meetings", skip(self))]
    pub async fn list_meetings(&self, include_deleted: bool) -> Result<Vec<Meeting>, DomainError> {
        let visibility = if include_deleted {
            Visibility::IncludeDeleted
        } else {
            Visibility::ActiveOnly
        };
        let meetings = self
            .repo
            .list(visibility)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!("Listed {} meetings", meetings.len());
        Ok(meetings)
    }

    /// Replace the join code of the meeting on `date` with a fresh one.
    #[instrument(name = "meetings.service.update_code", skip(self), fields(date = %date))]
    pub async fn update_code(&self, date: CalendarDate) -> Result<Meeting, DomainError> {
        info!("Regenerating meeting code");
        let meeting = self.get_by_date(date).await?;

        let attempts = self.config.max_code_attempts;
        for attempt in 1..=attempts {
            let Some(code) = self.candidate_code(Some(meeting.id)).await? else {
                debug!(attempt, "Code candidate collided");
                continue;
            };
            if code == meeting.code {
                continue;
            }
            let fields = MeetingFields {
                code: Some(code),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            match self.update(meeting.id, meeting.date, fields).await {
                Err(DomainError::CodeTaken { .. }) => {
                    debug!(attempt, "Code taken concurrently");
                }
                Ok(updated) => {
                    info!(meeting_id = %updated.id, "Meeting code regenerated");
                    return Ok(updated);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, "Meeting code generation exhausted");
        Err(DomainError::CodeGenerationExhausted { attempts })
    }

    /// Move a meeting to another date and/or give it an explicit code.
    #[instrument(name = "meetings.service.update_meeting", skip(self, patch), fields(meeting_id = %id))]
    pub async fn update_meeting(&self, id: Uuid, patch: MeetingPatch) -> Result<Meeting, DomainError> {
        info!("Updating meeting");
        let current = self.get_by_id(id).await?;
        let mut fields = MeetingFields::default();

        if let Some(code) = patch.code {
            if code != current.code {
                self.validate_code(&code)?;
                let taken = self
                    .repo
                    .find_by_code(&code, Some(id))
                    .await
                    .map_err(|e| DomainError::database(e.to_string()))?;
                if taken.is_some() {
                    return Err(DomainError::code_taken(code));
                }
                fields.code = Some(code);
            }
        }
        if let Some(date) = patch.date {
            let day = self.dates.normalize(&date);
            if day != current.date {
                if let Some(other) = self.find_by_date(day).await? {
                    debug!(other_id = %other.id, "Target date already has a meeting");
                    return Err(self.date_taken(day));
                }
                fields.date = Some(day);
            }
        }

        if fields.code.is_none() && fields.date.is_none() {
            return Err(DomainError::validation("no changes detected"));
        }
        fields.updated_at = Some(Utc::now());

        let updated = self.update(id, current.date, fields).await?;
        info!("Meeting updated");
        Ok(updated)
    }

    /// Idempotent: deleting a deleted meeting succeeds and keeps the first timestamp.
    #[instrument(name = "meetings.service.soft_delete", skip(self), fields(meeting_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DomainError> {
        let meeting = self
            .load(id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| DomainError::meeting_not_found(id))?;
        if meeting.is_deleted() {
            debug!("Meeting already deleted");
            return Ok(());
        }

        let now = Utc::now();
        self.update(
            id,
            meeting.date,
            MeetingFields {
                deleted_at: Some(Some(now)),
                updated_at: Some(now),
                ..Default::default()
            },
        )
        .await?;
        info!("Meeting soft-deleted");
        Ok(())
    }

    #[instrument(name = "meetings.service.recover", skip(self), fields(meeting_id = %id))]
    pub async fn recover(&self, id: Uuid) -> Result<Meeting, DomainError> {
        let meeting = self
            .load(id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| DomainError::meeting_not_found(id))?;
        if !meeting.is_deleted() {
            debug!("Meeting is active; nothing to recover");
            return Ok(meeting);
        }

        if self.find_by_date(meeting.date).await?.is_some() {
            return Err(self.date_taken(meeting.date));
        }
        let code_holder = self
            .repo
            .find_by_code(&meeting.code, Some(id))
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if code_holder.is_some() {
            return Err(DomainError::code_taken(meeting.code));
        }

        let recovered = self
            .update(
                id,
                meeting.date,
                MeetingFields {
                    deleted_at: Some(None),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        info!("Meeting recovered");
        Ok(recovered)
    }

    #[instrument(
        name = "meetings.service.start_attendance",
        skip(self, cmd),
        fields(meeting = %cmd.meeting, user_id = %cmd.user_id)
    )]
    pub async fn start_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, DomainError> {
        info!("Starting attendance");
        let meeting = self.attendance_target(&cmd).await?;

        let outcome = self
            .repo
            .append_attendance(meeting.id, cmd.user_id, Utc::now())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        match outcome {
            AppendOutcome::Appended(interval) => {
                info!(meeting_id = %meeting.id, "Attendance started");
                Ok(interval)
            }
            AppendOutcome::ActiveExists => Err(DomainError::ActiveAttendanceExists {
                user_id: cmd.user_id,
            }),
            AppendOutcome::MeetingGone => Err(DomainError::meeting_not_found(meeting.id)),
        }
    }

    /// Closes the earliest-started open interval if, against the store's
    /// guarantee, more than one is open.
    #[instrument(
        name = "meetings.service.finish_attendance",
        skip(self, cmd),
        fields(meeting = %cmd.meeting, user_id = %cmd.user_id)
    )]
    pub async fn finish_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, DomainError> {
        info!("Finishing attendance");
        let meeting = self.attendance_target(&cmd).await?;

        let outcome = self
            .repo
            .close_attendance(meeting.id, cmd.user_id, Utc::now())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        match outcome {
            CloseOutcome::Closed(interval) => {
                info!(meeting_id = %meeting.id, "Attendance finished");
                Ok(interval)
            }
            CloseOutcome::NoneOpen => Err(DomainError::NoAttendanceToFinish {
                user_id: cmd.user_id,
            }),
        }
    }

    #[instrument(name = "meetings.service.attendance_of", skip(self), fields(meeting = %key, user_id = %user_id))]
    pub async fn attendance_of(
        &self,
        key: &MeetingKey,
        user_id: Uuid,
    ) -> Result<Vec<AttendanceInterval>, DomainError> {
        let meeting = self.get(key).await?;
        Ok(meeting
            .attendance
            .into_iter()
            .filter(|a| a.user_id == user_id)
            .collect())
    }

    /// Resolve the meeting, check the join code, then the user.
    async fn attendance_target(&self, cmd: &AttendanceCommand) -> Result<Meeting, DomainError> {
        let meeting = self.get(&cmd.meeting).await?;
        if let Some(code) = &cmd.meeting_code {
            if *code != meeting.code {
                debug!(meeting_id = %meeting.id, "Meeting code mismatch");
                return Err(DomainError::InvalidMeetingCode);
            }
        }
        self.ensure_user(cmd.user_id).await?;
        Ok(meeting)
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), DomainError> {
        let exists = self
            .users
            .user_exists(user_id)
            .await
            .map_err(|e| DomainError::user_directory(e.to_string()))?;
        if exists {
            Ok(())
        } else {
            Err(DomainError::UserNotFound { user_id })
        }
    }

    /// One generate-and-check round; `None` means the candidate is in use.
    async fn candidate_code(&self, exclude_id: Option<Uuid>) -> Result<Option<String>, DomainError> {
        let code = self.codes.generate();
        let holder = self
            .repo
            .find_by_code(&code, exclude_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        Ok(holder.is_none().then_some(code))
    }

    async fn find_by_date(
        &self,
        day: DateTime<Utc>,
    ) -> Result<Option<Meeting>, DomainError> {
        self.repo
            .find_by_date(day, Visibility::ActiveOnly)
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    async fn load(&self, id: Uuid, visibility: Visibility) -> Result<Option<Meeting>, DomainError> {
        self.repo
            .find_by_id(id, visibility)
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    /// `current_date` names the conflict when the patch keeps the date.
    async fn update(
        &self,
        id: Uuid,
        current_date: DateTime<Utc>,
        fields: MeetingFields,
    ) -> Result<Meeting, DomainError> {
        let date = fields.date.unwrap_or(current_date);
        let code = fields.code.clone();
        match self
            .repo
            .update_fields(id, fields)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            UpdateOutcome::Updated(meeting) => Ok(meeting),
            UpdateOutcome::NotFound => Err(DomainError::meeting_not_found(id)),
            UpdateOutcome::DateTaken => Err(self.date_taken(date)),
            UpdateOutcome::CodeTaken => Err(DomainError::code_taken(code.unwrap_or_default())),
        }
    }

    fn duplicate(&self, existing: Meeting) -> DomainError {
        let day = self.dates.local_day(existing.date);
        DomainError::duplicate_meeting(existing, day)
    }

    fn date_taken(&self, date: DateTime<Utc>) -> DomainError {
        DomainError::DateTaken {
            day: self.dates.local_day(date),
        }
    }

    fn validate_code(&self, code: &str) -> Result<(), DomainError> {
        let len = code.chars().count();
        if len < self.config.min_code_len || len > self.config.max_code_len {
            return Err(DomainError::invalid_code(format!(
                "must be {} to {} characters",
                self.config.min_code_len, self.config.max_code_len
            )));
        }
        if !is_url_safe(code) {
            return Err(DomainError::invalid_code(
                "only letters, digits, '-' and '_' are allowed",
            ));
        }
        Ok(())
    }
}
