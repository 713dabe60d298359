//! 测试套件

mod persistence;
mod reimport;
