//! built-in document sources and recipes
use vapor::element::{Condition, Mapping, Output, Parameter, Resource};
use vapor::error::Result;
use vapor::intrinsics::{self, Pseudo};
use vapor::metadata::{CfnInit, Config, FileSpec, Service};
use vapor::recipe::Registry;
use vapor::template::Template;
use vapor::user_data::UserData;
use vapor::value::{Object, Value};

pub fn registry() -> Registry {
    Registry::new()
        .source("tiny", tiny)
        .source("vpc", vpc)
        .recipe("add-parameter", add_parameter)
        .recipe("replace-parameter", replace_parameter)
        .recipe("add-mapping", add_mapping)
}

fn tiny() -> Result<Template> {
    let mut t = Template::new("Sample Template");

    t.add(
        Parameter::new("SampleParameter")
            .description("this is sample parameter")
            .type_("String"),
    )?;
    let env_type = t.add(
        Parameter::new("EnvType")
            .type_("String")
            .default("dev")
            .allowed_values(["prod", "dev"]),
    )?;

    t.add(
        Mapping::new("SampleMapping")
            .category("Category1", |c| {
                c.item("ItemKey1", "Item Value1")
                    .item("ItemKey2", "Item Value2")
            })
            .category("Category2", |c| {
                c.item("ItemKey3", "Item Value3")
                    .item("ItemKey4", "Item Value4")
            }),
    )?;

    t.add(Condition::new("SampleCondition").expression(intrinsics::equals(&env_type, "prod")))?;

    let vpc = t.add(
        Resource::new("SampleResource")
            .type_("AWS::EC2::VPC")
            .properties([("CidrBlock", "10.0.0.0/16"), ("InstanceTenancy", "default")]),
    )?;

    t.add(Output::new("SampleOutput").description("-").value(&vpc))?;

    Ok(t)
}

const TD_AGENT_CONF: &str = "<source>\n  type dstat\n  tag dstat\n  option -cdnm --tcp --udp\n  delay 10\n</source>\n";

const BOOTSTRAP_SCRIPT: &str = "#!/bin/bash -xe
yum update -y aws-cfn-bootstrap
/opt/aws/bin/cfn-init -v --stack {{ stack_id }} --resource {{ resource_name }} --region {{ region }}
/opt/aws/bin/cfn-signal -e $? --stack {{ stack_id }} --resource {{ resource_name }} --region {{ region }}";

fn vpc() -> Result<Template> {
    let mut t = Template::new("VPC with a single api server");

    let key_name = t.add(
        Parameter::new("KeyName")
            .description("Name of an existing EC2 KeyPair to enable SSH access to the api server")
            .type_("AWS::EC2::KeyPair::KeyName"),
    )?;
    let instance_type = t.add(
        Parameter::new("InstanceType")
            .description("EC2 instance type of the api server")
            .type_("String")
            .default("t3.micro"),
    )?;

    let group_to_cidr = Mapping::new("GroupToCIDR")
        .item("VPC", "CIDR", "10.104.0.0/16")
        .item("ApiServerSubnet", "CIDR", "10.104.128.0/24");
    let vpc_cidr = group_to_cidr.find_in_map("VPC", "CIDR")?;
    let subnet_cidr = group_to_cidr.find_in_map("ApiServerSubnet", "CIDR")?;
    t.add(group_to_cidr)?;

    let region_to_ami = Mapping::new("RegionToAMI").item("ap-northeast-1", "AMI", "ami-a1bec3a0");
    let ami = region_to_ami.find_in_map(Pseudo::Region, "AMI")?;
    t.add(region_to_ami)?;

    let vpc = t.add(
        Resource::new("VPC")
            .type_("AWS::EC2::VPC")
            .properties([("CidrBlock", vpc_cidr), ("InstanceTenancy", "default".into())]),
    )?;
    let igw = t.add(Resource::new("InternetGateway").type_("AWS::EC2::InternetGateway"))?;
    let attach_igw = t.add(
        Resource::new("AttachInternetGateway")
            .type_("AWS::EC2::VPCGatewayAttachment")
            .properties([("VpcId", &vpc), ("InternetGatewayId", &igw)]),
    )?;

    let route_table = t.add(
        Resource::new("PublicRouteTable")
            .type_("AWS::EC2::RouteTable")
            .depends_on(&attach_igw)
            .property("VpcId", &vpc),
    )?;
    t.add(
        Resource::new("PublicRoute")
            .type_("AWS::EC2::Route")
            .depends_on(&attach_igw)
            .properties([
                ("RouteTableId", Value::from(&route_table)),
                ("DestinationCidrBlock", "0.0.0.0/0".into()),
                ("GatewayId", (&igw).into()),
            ]),
    )?;

    let subnet = t.add(
        Resource::new("ApiServerSubnet")
            .type_("AWS::EC2::Subnet")
            .depends_on(&attach_igw)
            .properties([
                ("VpcId", Value::from(&vpc)),
                ("AvailabilityZone", intrinsics::select("0", intrinsics::get_azs(""))),
                ("CidrBlock", subnet_cidr),
                ("MapPublicIpOnLaunch", "true".into()),
            ]),
    )?;
    t.add(
        Resource::new("ApiServerSubnetRouteTableAssociation")
            .type_("AWS::EC2::SubnetRouteTableAssociation")
            .properties([("SubnetId", &subnet), ("RouteTableId", &route_table)]),
    )?;

    let ingress = |protocol: &str, from: &str, to: &str, cidr: Value| {
        Value::object([
            ("IpProtocol", Value::from(protocol)),
            ("FromPort", from.into()),
            ("ToPort", to.into()),
            ("CidrIp", cidr),
        ])
    };
    let security_group = t.add(
        Resource::new("ApiServerSecurityGroup")
            .type_("AWS::EC2::SecurityGroup")
            .properties([
                ("VpcId", Value::from(&vpc)),
                ("GroupDescription", "Enable Web access to the api server via port 80".into()),
                (
                    "SecurityGroupIngress",
                    vec![ingress("tcp", "80", "80", "0.0.0.0/0".into())].into(),
                ),
            ]),
    )?;

    let server = Resource::new("ApiServer")
        .type_("AWS::EC2::Instance")
        .properties([
            ("ImageId", ami),
            ("InstanceType", Value::from(&instance_type)),
            ("SecurityGroupIds", vec![Value::from(&security_group)].into()),
            ("KeyName", Value::from(&key_name)),
            ("SubnetId", Value::from(&subnet)),
        ]);

    let mut params = Object::new();
    params.insert("stack_id".to_string(), Pseudo::StackId.into());
    params.insert("resource_name".to_string(), server.name().into());
    params.insert("region".to_string(), Pseudo::Region.into());

    let metadata = CfnInit::new()
        .config_set_of(
            "default",
            vec![
                Config::new("SetupRepos").command(
                    "import_td-agent_GPG-KEY",
                    "rpm --import https://packages.treasuredata.com/GPG-KEY-td-agent",
                ),
                Config::new("Install")
                    .package("yum", "dstat")
                    .package("yum", "td-agent")
                    .command("install_plugins", "td-agent-gem install fluent-plugin-dstat"),
                Config::new("Configure").file(
                    "/etc/td-agent/td-agent.conf",
                    FileSpec::inline(TD_AGENT_CONF.split_inclusive('\n'))
                        .mode("000644")
                        .owner("root")
                        .group("root"),
                )?,
                Config::new("Start").service(
                    "sysvinit",
                    "td-agent",
                    Service::new().enabled(true).ensure_running(true),
                ),
            ],
        )
        .build()?;

    t.add(
        server
            .property("UserData", UserData::from_text(BOOTSTRAP_SCRIPT, &params))
            .metadata(metadata),
    )?;

    t.add(Output::new("VpcId").description("-").value(&vpc))?;
    t.add(Output::new("ApiServerSubnet").description("-").value(&subnet))?;

    Ok(t)
}

fn add_parameter(t: &mut Template) -> Result<()> {
    t.add(
        Parameter::new("NewParameter")
            .description("Added new parameter by this recipe")
            .type_("String"),
    )?;
    Ok(())
}

fn replace_parameter(t: &mut Template) -> Result<()> {
    t.merge(Parameter::new("EnvType").default("prod"));
    Ok(())
}

fn add_mapping(t: &mut Template) -> Result<()> {
    t.merge(
        Mapping::new("RegionMap")
            .category("eu-west-1", |c| c.item("AMI", "ami-24506250").item("TestAZ", "eu-west-1a"))
            .category("sa-east-1", |c| c.item("AMI", "ami-3e3be423").item("TestAZ", "sa-east-1a"))
            .category("ap-southeast-1", |c| {
                c.item("AMI", "ami-74dda626").item("TestAZ", "ap-southeast-1a")
            })
            .category("ap-northeast-1", |c| {
                c.item("AMI", "ami-dcfa4edd").item("TestAZ", "ap-northeast-1a")
            }),
    );
    Ok(())
}
