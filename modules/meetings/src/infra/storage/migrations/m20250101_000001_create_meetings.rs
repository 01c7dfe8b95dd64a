use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Meetings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meetings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Meetings::Date).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Meetings::Code).string().not_null())
                    .col(ColumnDef::new(Meetings::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Meetings::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Meetings::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MeetingAttendance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeetingAttendance::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MeetingAttendance::MeetingId).uuid().not_null())
                    .col(ColumnDef::new(MeetingAttendance::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(MeetingAttendance::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MeetingAttendance::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_attendance_meeting")
                            .from(MeetingAttendance::Table, MeetingAttendance::MeetingId)
                            .to(Meetings::Table, Meetings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_meeting_attendance_meeting")
                    .table(MeetingAttendance::Table)
                    .col(MeetingAttendance::MeetingId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Partial unique indexes back the service-level checks.
        let db = manager.get_connection();
        for stmt in [
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_meetings_date_active \
             ON meetings (date) WHERE deleted_at IS NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_meetings_code_active \
             ON meetings (code) WHERE deleted_at IS NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_meeting_attendance_open \
             ON meeting_attendance (meeting_id, user_id) WHERE end_time IS NULL",
        ] {
            db.execute_unprepared(stmt).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MeetingAttendance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Meetings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Meetings {
    Table,
    Id,
    Date,
    Code,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum MeetingAttendance {
    Table,
    Id,
    MeetingId,
    UserId,
    StartTime,
    EndTime,
}
