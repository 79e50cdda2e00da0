use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // seq 自增，保证同优先级内先进先出
        manager
            .create_table(
                Table::create()
                    .table(DispatchMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DispatchMessages::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DispatchMessages::QueueName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DispatchMessages::JobId).uuid().not_null())
                    .col(ColumnDef::new(DispatchMessages::Payload).json().not_null())
                    .col(
                        ColumnDef::new(DispatchMessages::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DispatchMessages::EnqueuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DispatchMessages::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // 为空表示等待投递，非空表示租约到期前对其他消费者不可见
                    .col(
                        ColumnDef::new(DispatchMessages::LeasedUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dispatch_queue_priority_seq")
                    .table(DispatchMessages::Table)
                    .col(DispatchMessages::QueueName)
                    .col(DispatchMessages::Priority)
                    .col(DispatchMessages::Seq)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DispatchMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DispatchMessages {
    Table,
    Seq,
    QueueName,
    JobId,
    Payload,
    Priority,
    EnqueuedAt,
    Attempts,
    LeasedUntil,
}
