// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 爬取模块
///
/// 实现RSS源抓取、正文提取、去重和限速
pub mod crawler;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供仓库接口的具体实现
pub mod infrastructure;

/// 进度模块
///
/// 实现任务进度的发布/订阅广播
pub mod progress;

/// 任务模块
///
/// 实现任务状态机和执行流水线
pub mod tasks;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
