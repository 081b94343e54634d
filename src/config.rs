use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs;

use crate::{
    language::LanguageSettings,
    param::{DEFAULT_PAGE_LENGTH, MAX_PAGE_LENGTH},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// 挂载点前缀，如 `/kiwix`；为空表示挂在根路径
    #[serde(default)]
    root_location: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_library_file")]
    library_file: String,
    #[serde(default = "default_language")]
    default_language: String,
    #[serde(default = "default_supported_languages")]
    supported_languages: Vec<String>,
    #[serde(default = "default_page_length")]
    page_length: u32,
    #[serde(default = "default_max_page_length")]
    max_page_length: u32,
    #[serde(default = "default_compression_threshold")]
    compression_threshold: usize,
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_library_file() -> String {
    "config/library.json".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_supported_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_page_length() -> u32 {
    DEFAULT_PAGE_LENGTH
}

fn default_max_page_length() -> u32 {
    MAX_PAGE_LENGTH
}

fn default_compression_threshold() -> usize {
    1400 // 约一个 TCP 报文段
}

impl Config {
    pub fn new() -> Self {
        Self {
            root_location: String::new(),
            port: default_port(),
            worker_threads: 0,
            local: default_local(),
            library_file: default_library_file(),
            default_language: default_language(),
            supported_languages: default_supported_languages(),
            page_length: default_page_length(),
            max_page_length: default_max_page_length(),
            compression_threshold: default_compression_threshold(),
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let str_val = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) => {
                error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
                return Self::new().normalized();
            }
        };

        let raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.max_page_length == 0 {
            warn!("max_page_length被设置为0，该值将被改为{}。", MAX_PAGE_LENGTH);
            self.max_page_length = MAX_PAGE_LENGTH;
        }
        if self.page_length == 0 || self.page_length > self.max_page_length {
            warn!(
                "page_length={}不在1..={}之间，该值将被改为{}。",
                self.page_length,
                self.max_page_length,
                DEFAULT_PAGE_LENGTH.min(self.max_page_length)
            );
            self.page_length = DEFAULT_PAGE_LENGTH.min(self.max_page_length);
        }
        if !self
            .supported_languages
            .iter()
            .any(|l| l == &self.default_language)
        {
            warn!(
                "默认语言{}不在支持列表中，已加入支持列表",
                self.default_language
            );
            self.supported_languages.push(self.default_language.clone());
        }
        self
    }

    /// 请求中 `pageLength` 参数的取值规则：0 取默认值，超过上限取上限
    pub fn clamp_page_length(&self, requested: u32) -> u32 {
        match requested {
            0 => self.page_length,
            n => n.min(self.max_page_length),
        }
    }

    pub fn language_settings(&self) -> LanguageSettings {
        LanguageSettings::new(&self.default_language, &self.supported_languages)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn root_location(&self) -> &str {
        &self.root_location
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn library_file(&self) -> &str {
        &self.library_file
    }

    pub fn page_length(&self) -> u32 {
        self.page_length
    }

    pub fn max_page_length(&self) -> u32 {
        self.max_page_length
    }

    pub fn compression_threshold(&self) -> usize {
        self.compression_threshold
    }
}
