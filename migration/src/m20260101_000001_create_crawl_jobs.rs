use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlJobs::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(CrawlJobs::TargetUrl).text().not_null())
                    .col(
                        ColumnDef::new(CrawlJobs::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlJobs::State).string_len(16).not_null())
                    .col(
                        ColumnDef::new(CrawlJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CrawlJobs::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlJobs::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlJobs::SlaDeadline).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlJobs::Result).json())
                    .col(ColumnDef::new(CrawlJobs::Error).text())
                    .col(
                        ColumnDef::new(CrawlJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // SLA 监控按状态与截止时间扫描
        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_jobs_state_sla")
                    .table(CrawlJobs::Table)
                    .col(CrawlJobs::State)
                    .col(CrawlJobs::SlaDeadline)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlJobs {
    Table,
    Id,
    Kind,
    TargetUrl,
    Priority,
    State,
    CreatedAt,
    StartedAt,
    CompletedAt,
    SlaDeadline,
    Result,
    Error,
    UpdatedAt,
}
