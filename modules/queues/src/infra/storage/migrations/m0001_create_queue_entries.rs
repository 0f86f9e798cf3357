use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum QueueEntries {
    Table,
    Id,
    PatientId,
    HospitalName,
    Specialty,
    Notes,
    Priority,
    Position,
    QueueNumber,
    Status,
    EstimatedWaitTime,
    JoinedAt,
    CalledAt,
    CancelledAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueueEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QueueEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(QueueEntries::PatientId).uuid().not_null())
                    .col(ColumnDef::new(QueueEntries::HospitalName).string().not_null())
                    .col(ColumnDef::new(QueueEntries::Specialty).string().not_null())
                    .col(ColumnDef::new(QueueEntries::Notes).text().null())
                    .col(
                        ColumnDef::new(QueueEntries::Priority)
                            .string_len(16)
                            .not_null()
                            .default("normal"),
                    )
                    .col(ColumnDef::new(QueueEntries::Position).integer().not_null())
                    .col(ColumnDef::new(QueueEntries::QueueNumber).string_len(32).not_null())
                    .col(
                        ColumnDef::new(QueueEntries::Status)
                            .string_len(16)
                            .not_null()
                            .default("waiting"),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::EstimatedWaitTime)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::CalledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QueueEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_queue_entries_partition")
                    .table(QueueEntries::Table)
                    .col(QueueEntries::HospitalName)
                    .col(QueueEntries::Specialty)
                    .col(QueueEntries::Status)
                    .col(QueueEntries::Position)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_queue_entries_patient")
                    .table(QueueEntries::Table)
                    .col(QueueEntries::PatientId)
                    .col(QueueEntries::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueEntries::Table).to_owned())
            .await
    }
}
