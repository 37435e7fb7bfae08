use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupon::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Coupon::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Coupon::Code).string_len(120).not_null())
                    .col(ColumnDef::new(Coupon::Platform).string_len(80).not_null())
                    .col(ColumnDef::new(Coupon::Details).string_len(500))
                    .col(ColumnDef::new(Coupon::SubmittedBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(Coupon::SubmittedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupon::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Coupon::ClaimedBy).big_integer())
                    .col(ColumnDef::new(Coupon::ClaimedAt).date_time())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coupon::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Coupon {
    Table,
    Id,
    Code,
    Platform,
    Details,
    SubmittedBy,
    SubmittedAt,
    Status,
    ClaimedBy,
    ClaimedAt,
}
