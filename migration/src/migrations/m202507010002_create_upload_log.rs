use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202507010002_create_upload_log"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key: an archived id stays logged even after the assignment is removed.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("upload_log"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("assignment_id")).string().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("archived_at")).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("upload_log")).to_owned())
            .await
    }
}
