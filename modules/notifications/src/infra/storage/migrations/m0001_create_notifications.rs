use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Message,
    Kind,
    Priority,
    RelatedKind,
    RelatedId,
    IsRead,
    ReadAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NotificationOutbox {
    Table,
    Id,
    UserId,
    Title,
    Message,
    Kind,
    Priority,
    RelatedKind,
    RelatedId,
    Attempts,
    NextAttemptAt,
    LastError,
    DispatchedAt,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Notifications::Priority).string_len(16).not_null())
                    .col(ColumnDef::new(Notifications::RelatedKind).string_len(32).null())
                    .col(ColumnDef::new(Notifications::RelatedId).uuid().null())
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_created")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NotificationOutbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationOutbox::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::UserId).uuid().not_null())
                    .col(ColumnDef::new(NotificationOutbox::Title).string().not_null())
                    .col(ColumnDef::new(NotificationOutbox::Message).text().not_null())
                    .col(ColumnDef::new(NotificationOutbox::Kind).string_len(32).not_null())
                    .col(
                        ColumnDef::new(NotificationOutbox::Priority)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::RelatedKind)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::RelatedId).uuid().null())
                    .col(
                        ColumnDef::new(NotificationOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::NextAttemptAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::LastError).text().null())
                    .col(
                        ColumnDef::new(NotificationOutbox::DispatchedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_outbox_due")
                    .table(NotificationOutbox::Table)
                    .col(NotificationOutbox::DispatchedAt)
                    .col(NotificationOutbox::NextAttemptAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationOutbox::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}
