//! Input scheme printed for `--scheme`.

/// Describes the input and its arguments to the invoking scheduler.
pub const SCHEME: &str = r#"<scheme>
    <title>Powerclub Usage Data</title>
    <description>Half-hourly power, solar and price data from Powerclub</description>
    <use_external_validation>true</use_external_validation>
    <streaming_mode>xml</streaming_mode>

    <endpoint>
        <args>
            <arg name="email">
                <title>Email</title>
                <description>Email address of the Powerclub account</description>
                <data_type>string</data_type>
                <required_on_create>true</required_on_create>
            </arg>
            <arg name="password">
                <title>Password</title>
                <description>Password of the Powerclub account</description>
                <data_type>string</data_type>
                <required_on_create>true</required_on_create>
            </arg>
            <arg name="timezone">
                <title>Time zone</title>
                <description>IANA zone of the meter, e.g. Pacific/Auckland; defaults to the host zone</description>
                <data_type>string</data_type>
                <required_on_create>false</required_on_create>
            </arg>
        </args>
    </endpoint>
</scheme>"#;
