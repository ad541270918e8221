//! fanout-core
//!
//! Core building blocks for running one worker session per (date, partition)
//! against a session backend.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskKey, SessionSerial, SessionStatus, errors）
//! - **config**: YAML ジョブ設定の読み込みと検証
//! - **queue**: タスク状態、pending queue、retry policy
//! - **ports**: 抽象化レイヤー（SessionClient）
//! - **impls**: 実装（InMemorySessionClient, ProcessSessionClient）
//! - **app**: アプリケーションロジック（Orchestrator, RunReport）
//! - **observability**: 集計カウンタ

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
