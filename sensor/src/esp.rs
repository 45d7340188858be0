use core::convert::TryInto;
use std::time::Duration;

use anyhow::{anyhow, Context};
use dht_sensor::dht11;
use embedded_graphics::{
    mono_font::{ascii::FONT_5X8, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_svc::{
    http::{client::Client as HttpClient, Method, Status},
    io::{Read, Write},
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, IOPin, InputOutput, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    units::FromValueType,
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, prelude::Peripherals},
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    wifi::{BlockingWifi, EspWifi},
};
use log::{info, warn};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use roomtalk_common::{
    DescribeRequest, DisplayFrame, GatewayLink, GatewayReply, Network, NetworkError, Sample,
    Screen, SendError, Sensor, SensorAgent, SensorConfig, SystemClock,
};

const LINE_HEIGHT_PX: i32 = 8;
const READ_CHUNK_SIZE: usize = 256;

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = SensorConfig::default();
    info!(
        "ESP32 DHT11 sensor: DHT on GPIO{}, OLED on SDA GPIO{} / SCL GPIO{}, gateway {}",
        config.dht_pin, config.oled_sda_pin, config.oled_scl_pin, config.gateway_url
    );

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let Peripherals {
        modem, pins, i2c0, ..
    } = Peripherals::take()?;

    let screen = OledScreen::new(i2c0, pins.gpio21, pins.gpio22, config.oled_i2c_addr);
    let sensor = Dht11Sensor::new(pins.gpio15.downgrade()).context("failed to initialize DHT11")?;
    let network = WifiNetwork::new(modem, sys_loop, nvs_partition, &config)
        .context("wifi startup failed")?;
    let link = EspGatewayLink {
        url: config.gateway_url.clone(),
        timeout: config.http_timeout(),
    };

    let mut agent = SensorAgent::new(&config, sensor, link, screen, network, SystemClock);
    agent.run()
}

struct Dht11Sensor {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
    delay: Ets,
}

impl Dht11Sensor {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin, delay: Ets })
    }
}

impl Sensor for Dht11Sensor {
    fn sample(&mut self) -> Option<Sample> {
        if let Err(err) = self.pin.set_high() {
            warn!("failed to set DHT11 line high before read: {err:?}");
            return None;
        }

        match dht11::blocking::read(&mut self.delay, &mut self.pin) {
            Ok(reading) => Some(Sample {
                temperature_c: f64::from(reading.temperature),
                humidity: f64::from(reading.relative_humidity),
            }),
            Err(err) => {
                warn!("DHT11 read error: {err:?}");
                None
            }
        }
    }
}

type OledDisplay = Ssd1306<
    I2CInterface<I2cDriver<'static>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 128x64 over I2C. Runs headless when the panel does not answer.
struct OledScreen {
    display: Option<OledDisplay>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl OledScreen {
    fn new(
        i2c: esp_idf_hal::i2c::I2C0,
        sda: esp_idf_hal::gpio::Gpio21,
        scl: esp_idf_hal::gpio::Gpio22,
        address: u8,
    ) -> Self {
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_5X8)
            .text_color(BinaryColor::On)
            .build();

        let display = match Self::init_display(i2c, sda, scl, address) {
            Ok(display) => Some(display),
            Err(err) => {
                warn!("OLED init failed: {err:#}");
                None
            }
        };
        Self { display, style }
    }

    fn init_display(
        i2c: esp_idf_hal::i2c::I2C0,
        sda: esp_idf_hal::gpio::Gpio21,
        scl: esp_idf_hal::gpio::Gpio22,
        address: u8,
    ) -> anyhow::Result<OledDisplay> {
        let i2c_config = I2cConfig::new().baudrate(400.kHz().into());
        let driver = I2cDriver::new(i2c, sda, scl, &i2c_config)?;
        let interface = I2CDisplayInterface::new_custom_address(driver, address);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display
            .init()
            .map_err(|err| anyhow!("display init: {err:?}"))?;
        Ok(display)
    }
}

impl Screen for OledScreen {
    fn show(&mut self, frame: &DisplayFrame) {
        let Some(display) = self.display.as_mut() else {
            return;
        };

        let _ = display.clear(BinaryColor::Off);
        for (row, line) in frame.lines.iter().enumerate() {
            let y = row as i32 * LINE_HEIGHT_PX;
            let _ = Text::with_baseline(line, Point::new(0, y), self.style, Baseline::Top)
                .draw(display);
        }
        if let Err(err) = display.flush() {
            warn!("OLED flush failed: {err:?}");
        }
    }
}

/// Station-mode Wi-Fi. Configured and started once; `connect` is re-entered
/// by the agent after a drop.
struct WifiNetwork {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiNetwork {
    fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs_partition: EspDefaultNvsPartition,
        config: &SensorConfig,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        let auth_method = if config.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi ssid too long"))?,
            password: config
                .wifi_pass
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("wifi started, connecting to `{}`", config.wifi_ssid);
        Ok(Self { wifi })
    }
}

impl Network for WifiNetwork {
    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn connect(&mut self) -> Result<(), NetworkError> {
        let _ = self.wifi.disconnect();
        self.wifi
            .connect()
            .map_err(|err| NetworkError(format!("wifi connect: {err}")))?;
        self.wifi
            .wait_netif_up()
            .map_err(|err| NetworkError(format!("wifi netif up: {err}")))
    }

    fn address(&mut self) -> Option<String> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.to_string())
    }
}

struct EspGatewayLink {
    url: String,
    timeout: Duration,
}

impl EspGatewayLink {
    fn exchange(&self, body: &[u8]) -> anyhow::Result<GatewayReply> {
        let http_conf = HttpClientConfiguration {
            timeout: Some(self.timeout),
            ..Default::default()
        };
        let mut client = HttpClient::wrap(EspHttpConnection::new(&http_conf)?);

        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", content_length.as_str()),
        ];
        let mut request = client.request(Method::Post, &self.url, &headers)?;
        request.write_all(body).map_err(|e| anyhow!("{e:?}"))?;
        request.flush().map_err(|e| anyhow!("{e:?}"))?;
        let mut response = request.submit().map_err(|e| anyhow!("{e:?}"))?;

        let status = response.status();
        let mut bytes = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK_SIZE];
        loop {
            let read = response.read(&mut chunk).map_err(|e| anyhow!("{e:?}"))?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
        }

        Ok(GatewayReply {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl GatewayLink for EspGatewayLink {
    fn post(&mut self, request: &DescribeRequest) -> Result<GatewayReply, SendError> {
        let body =
            serde_json::to_vec(request).map_err(|err| SendError::Transport(err.to_string()))?;
        self.exchange(&body)
            .map_err(|err| SendError::Transport(format!("{err:#}")))
    }
}
