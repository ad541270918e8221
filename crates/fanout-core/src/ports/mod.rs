//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! Session backend（クエリエンジンのコントローラ、ローカルプロセスなど）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod session_client;

pub use self::session_client::SessionClient;
