// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dispatch_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i32,
    pub queue_name: String,
    pub job_id: Uuid,
    pub payload: Json,
    pub priority: i32,
    pub enqueued_at: ChronoDateTimeWithTimeZone,
    pub attempts: i32,
    pub leased_until: Option<ChronoDateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
