// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 搜索领域模块
///
/// 定义搜索索引接口和索引结果的领域表示
pub mod index;
