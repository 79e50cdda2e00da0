// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod api_test;
pub mod elasticsearch_test;
pub mod job_repository_test;
pub mod postgres_queue_test;
