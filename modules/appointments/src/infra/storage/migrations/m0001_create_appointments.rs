use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Appointments {
    Table,
    Id,
    PatientId,
    Doctor,
    Specialty,
    HospitalName,
    AppointmentDate,
    AppointmentTime,
    Notes,
    Status,
    PatientFullName,
    PatientPhone,
    PatientGender,
    PatientDateOfBirth,
    RemindedAt,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Appointments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Appointments::PatientId).uuid().not_null())
                    .col(ColumnDef::new(Appointments::Doctor).string().not_null())
                    .col(ColumnDef::new(Appointments::Specialty).string().not_null())
                    .col(ColumnDef::new(Appointments::HospitalName).string().null())
                    .col(
                        ColumnDef::new(Appointments::AppointmentDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Appointments::AppointmentTime).string_len(32).not_null())
                    .col(ColumnDef::new(Appointments::Notes).text().null())
                    .col(
                        ColumnDef::new(Appointments::Status)
                            .string_len(16)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Appointments::PatientFullName).string().not_null())
                    .col(ColumnDef::new(Appointments::PatientPhone).string_len(32).not_null())
                    .col(ColumnDef::new(Appointments::PatientGender).string_len(32).not_null())
                    .col(ColumnDef::new(Appointments::PatientDateOfBirth).date().not_null())
                    .col(
                        ColumnDef::new(Appointments::RemindedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Appointments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Appointments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_patient_date")
                    .table(Appointments::Table)
                    .col(Appointments::PatientId)
                    .col(Appointments::AppointmentDate)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_reminder_due")
                    .table(Appointments::Table)
                    .col(Appointments::Status)
                    .col(Appointments::AppointmentDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Appointments::Table).to_owned())
            .await
    }
}
