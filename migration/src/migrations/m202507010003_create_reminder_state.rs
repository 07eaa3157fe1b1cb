use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202507010003_create_reminder_state"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("reminder_state"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("assignment_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("user_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("sent_long")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("sent_short")).boolean().not_null().default(false))
                    .primary_key(
                        Index::create()
                            .col(Alias::new("assignment_id"))
                            .col(Alias::new("user_id")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("reminder_state")).to_owned())
            .await
    }
}
